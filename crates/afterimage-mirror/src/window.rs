// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window burst classification of deletion batches.
//!
//! Telegram reports a cleared chat as several deletion updates arriving in
//! quick succession. Each batch is recorded in a per-chat ledger; a batch is
//! a chat clear when it is large on its own, large relative to what is
//! stored for the chat, or part of a burst inside the window.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use afterimage_config::model::DeletionConfig;
use afterimage_core::types::ChatId;

/// Thresholds for chat-clear detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionPolicy {
    pub window: Duration,
    pub min_batch: usize,
    pub clear_ratio: f64,
    pub burst_threshold: usize,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        Self::from(&DeletionConfig::default())
    }
}

impl From<&DeletionConfig> for DeletionPolicy {
    fn from(config: &DeletionConfig) -> Self {
        Self {
            window: config.window(),
            min_batch: config.min_batch,
            clear_ratio: config.clear_ratio,
            burst_threshold: config.burst_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Ordinary,
    ChatClear,
}

/// The first rule that marked a batch as a chat clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    BatchSize,
    Ratio,
    Burst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    pub reason: Option<ClearReason>,
    /// Deleted-message total inside the window, this batch included.
    pub recent_total: usize,
}

impl Verdict {
    pub fn is_chat_clear(&self) -> bool {
        self.classification == Classification::ChatClear
    }
}

/// Per-chat ledger of recent deletion batch sizes.
///
/// Process-local; it starts empty after a restart.
#[derive(Debug)]
pub struct DeletionWindow {
    horizon: Duration,
    ledgers: HashMap<ChatId, VecDeque<(Instant, usize)>>,
}

impl DeletionWindow {
    pub fn new(horizon: Duration) -> Self {
        Self {
            horizon,
            ledgers: HashMap::new(),
        }
    }

    /// Drops entries older than the horizon in every chat and forgets
    /// chats whose ledger became empty.
    pub fn prune(&mut self, now: Instant) {
        let horizon = self.horizon;
        self.ledgers.retain(|_, ledger| {
            while let Some(&(at, _)) = ledger.front() {
                if now.saturating_duration_since(at) > horizon {
                    ledger.pop_front();
                } else {
                    break;
                }
            }
            !ledger.is_empty()
        });
    }

    /// Prunes, appends `(now, count)` for `chat`, and returns the chat's
    /// total inside the window.
    pub fn record(&mut self, chat: ChatId, count: usize, now: Instant) -> usize {
        self.prune(now);
        let ledger = self.ledgers.entry(chat).or_default();
        ledger.push_back((now, count));
        ledger.iter().map(|&(_, n)| n).sum()
    }

    pub fn recent_total(&self, chat: ChatId) -> usize {
        self.ledgers
            .get(&chat)
            .map(|ledger| ledger.iter().map(|&(_, n)| n).sum())
            .unwrap_or(0)
    }

    /// Number of chats with a non-empty ledger.
    pub fn tracked_chats(&self) -> usize {
        self.ledgers.len()
    }
}

/// Applies a [`DeletionPolicy`] to incoming batches using a [`DeletionWindow`].
#[derive(Debug)]
pub struct BurstClassifier {
    policy: DeletionPolicy,
    window: DeletionWindow,
}

impl BurstClassifier {
    pub fn new(policy: DeletionPolicy) -> Self {
        let window = DeletionWindow::new(policy.window);
        Self { policy, window }
    }

    pub fn policy(&self) -> &DeletionPolicy {
        &self.policy
    }

    pub fn window(&self) -> &DeletionWindow {
        &self.window
    }

    /// Records a batch of `batch_size` deletions and classifies it.
    ///
    /// `total_before` is the number of rows stored for the chat before any
    /// of the batch was removed.
    pub fn classify(
        &mut self,
        chat: ChatId,
        batch_size: usize,
        total_before: u64,
        now: Instant,
    ) -> Verdict {
        let recent_total = self.window.record(chat, batch_size, now);

        let reason = if batch_size >= self.policy.min_batch {
            Some(ClearReason::BatchSize)
        } else if total_before > 0
            && (batch_size as f64 / total_before as f64) > self.policy.clear_ratio
        {
            Some(ClearReason::Ratio)
        } else if recent_total >= self.policy.burst_threshold {
            Some(ClearReason::Burst)
        } else {
            None
        };

        Verdict {
            classification: if reason.is_some() {
                Classification::ChatClear
            } else {
                Classification::Ordinary
            },
            reason,
            recent_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CHAT: ChatId = ChatId(1);

    fn classifier() -> BurstClassifier {
        BurstClassifier::new(DeletionPolicy::default())
    }

    #[test]
    fn default_policy_matches_config_defaults() {
        let policy = DeletionPolicy::default();
        assert_eq!(policy.window, Duration::from_secs(10));
        assert_eq!(policy.min_batch, 2);
        assert_eq!(policy.clear_ratio, 0.20);
        assert_eq!(policy.burst_threshold, 3);
    }

    #[test]
    fn single_deletion_in_large_chat_is_ordinary() {
        let mut c = classifier();
        let verdict = c.classify(CHAT, 1, 100, Instant::now());
        assert_eq!(verdict.classification, Classification::Ordinary);
        assert_eq!(verdict.reason, None);
        assert_eq!(verdict.recent_total, 1);
    }

    #[test]
    fn batch_of_two_is_a_clear() {
        let mut c = classifier();
        let verdict = c.classify(CHAT, 2, 100, Instant::now());
        assert!(verdict.is_chat_clear());
        assert_eq!(verdict.reason, Some(ClearReason::BatchSize));
    }

    #[test]
    fn single_deletion_in_small_chat_is_a_clear_by_ratio() {
        let mut c = classifier();
        // 1 / 4 = 0.25 > 0.20
        let verdict = c.classify(CHAT, 1, 4, Instant::now());
        assert_eq!(verdict.reason, Some(ClearReason::Ratio));

        // 1 / 5 = 0.20 is not strictly greater.
        let mut c = classifier();
        let verdict = c.classify(CHAT, 1, 5, Instant::now());
        assert_eq!(verdict.classification, Classification::Ordinary);
    }

    #[test]
    fn empty_chat_uses_no_ratio() {
        let mut c = classifier();
        let verdict = c.classify(CHAT, 1, 0, Instant::now());
        assert_eq!(verdict.classification, Classification::Ordinary);
    }

    #[test]
    fn three_singles_inside_window_become_a_burst() {
        let mut c = classifier();
        let start = Instant::now();
        assert!(!c.classify(CHAT, 1, 100, start).is_chat_clear());
        assert!(!c
            .classify(CHAT, 1, 99, start + Duration::from_secs(3))
            .is_chat_clear());
        let third = c.classify(CHAT, 1, 98, start + Duration::from_secs(6));
        assert_eq!(third.reason, Some(ClearReason::Burst));
        assert_eq!(third.recent_total, 3);
    }

    #[test]
    fn singles_spread_beyond_window_stay_ordinary() {
        let mut c = classifier();
        let start = Instant::now();
        for i in 0..5u64 {
            let verdict = c.classify(CHAT, 1, 100, start + Duration::from_secs(11 * i));
            assert_eq!(verdict.classification, Classification::Ordinary);
            assert_eq!(verdict.recent_total, 1);
        }
    }

    #[test]
    fn ledgers_are_per_chat() {
        let mut c = classifier();
        let now = Instant::now();
        c.classify(ChatId(1), 1, 100, now);
        c.classify(ChatId(2), 1, 100, now);
        let verdict = c.classify(ChatId(1), 1, 100, now);
        assert_eq!(verdict.recent_total, 2);
        assert_eq!(c.window().recent_total(ChatId(2)), 1);
    }

    #[test]
    fn expired_chats_are_forgotten() {
        let mut window = DeletionWindow::new(Duration::from_secs(10));
        let start = Instant::now();
        window.record(ChatId(1), 1, start);
        window.record(ChatId(2), 1, start);
        assert_eq!(window.tracked_chats(), 2);

        window.record(ChatId(3), 1, start + Duration::from_secs(20));
        assert_eq!(window.tracked_chats(), 1);
        assert_eq!(window.recent_total(ChatId(1)), 0);
    }

    proptest! {
        #[test]
        fn batches_at_or_above_min_batch_always_clear(
            batch in 2usize..500,
            total in 0u64..10_000,
        ) {
            let mut c = classifier();
            prop_assert!(c.classify(CHAT, batch, total, Instant::now()).is_chat_clear());
        }

        #[test]
        fn window_never_tracks_more_than_horizon(offsets in proptest::collection::vec(0u64..100, 1..30)) {
            let mut window = DeletionWindow::new(Duration::from_secs(10));
            let start = Instant::now();
            let mut sorted = offsets;
            sorted.sort_unstable();
            let mut last = 0;
            for secs in &sorted {
                window.record(CHAT, 1, start + Duration::from_secs(*secs));
                last = *secs;
            }
            let expected = sorted.iter().filter(|s| last - **s <= 10).count();
            prop_assert_eq!(window.recent_total(CHAT), expected);
        }
    }
}
