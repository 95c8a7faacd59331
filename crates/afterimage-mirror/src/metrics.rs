// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; nothing is exported unless the embedding
//! binary installs a recorder.

use metrics::describe_counter;

use afterimage_core::types::MediaKind;

/// Register all Afterimage metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "afterimage_messages_stored_total",
        "Business messages written to the shadow-store"
    );
    describe_counter!("afterimage_edits_total", "Edits reported to owners");
    describe_counter!(
        "afterimage_deletions_total",
        "Deleted messages processed, by outcome"
    );
    describe_counter!(
        "afterimage_chat_clears_total",
        "Deletion batches classified as a chat clear"
    );
    describe_counter!(
        "afterimage_recoveries_total",
        "View-once media recovered via the reply trick"
    );
}

pub fn record_message_stored(kind: MediaKind) {
    metrics::counter!("afterimage_messages_stored_total", "media_kind" => kind.to_string())
        .increment(1);
}

pub fn record_edit() {
    metrics::counter!("afterimage_edits_total").increment(1);
}

/// `outcome` is one of `notified`, `silent`, `skipped`, `failed`, `dropped`.
pub fn record_deletion(outcome: &'static str) {
    metrics::counter!("afterimage_deletions_total", "outcome" => outcome).increment(1);
}

pub fn record_chat_clear() {
    metrics::counter!("afterimage_chat_clears_total").increment(1);
}

pub fn record_recovery(kind: MediaKind) {
    metrics::counter!("afterimage_recoveries_total", "media_kind" => kind.to_string())
        .increment(1);
}
