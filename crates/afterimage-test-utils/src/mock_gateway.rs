// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging gateway for deterministic testing.
//!
//! `MockGateway` implements `MessagingGateway` with injectable events,
//! captured outbound messages, canned downloads, and scripted send failures.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use afterimage_core::AfterimageError;
use afterimage_core::traits::adapter::PluginAdapter;
use afterimage_core::traits::gateway::MessagingGateway;
use afterimage_core::types::{
    AdapterType, BusinessEvent, DeliveryReceipt, FileRef, HealthStatus, MessageId, OutboundMessage,
};

/// A mock bot gateway for testing.
///
/// Provides two queues:
/// - **inbound**: Events injected via `inject_event()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
pub struct MockGateway {
    inbound: Arc<Mutex<VecDeque<BusinessEvent>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    downloads: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    fail_next: AtomicUsize,
    fail_all: AtomicBool,
    send_attempts: AtomicUsize,
    next_id: AtomicI64,
}

impl MockGateway {
    /// Create a new mock gateway with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            downloads: Arc::new(Mutex::new(HashMap::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            fail_next: AtomicUsize::new(0),
            fail_all: AtomicBool::new(false),
            send_attempts: AtomicUsize::new(0),
            next_id: AtomicI64::new(1),
        }
    }

    /// Inject an event into the receive queue.
    pub async fn inject_event(&self, event: BusinessEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Ends the event stream once the queue drains.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Registers bytes returned by `download()` for `file_id`.
    pub async fn add_download(&self, file_id: &str, bytes: &[u8]) {
        self.downloads
            .lock()
            .await
            .insert(file_id.to_string(), bytes.to_vec());
    }

    /// Makes the next `n` sends fail.
    pub fn fail_next_sends(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Makes every send fail until reset.
    pub fn fail_all_sends(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Get all messages that were delivered through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Get the count of delivered messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Sends attempted, failed ones included.
    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    fn should_fail(&self) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, AfterimageError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AfterimageError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn connect(&mut self) -> Result<(), AfterimageError> {
        Ok(())
    }

    async fn receive(&self) -> Result<BusinessEvent, AfterimageError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(AfterimageError::gateway("mock update stream closed"));
            }
            self.notify.notified().await;
        }
    }

    async fn send(&self, msg: OutboundMessage) -> Result<DeliveryReceipt, AfterimageError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail() {
            return Err(AfterimageError::gateway("mock send failure"));
        }
        self.sent.lock().await.push(msg);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryReceipt {
            message_id: MessageId(id),
        })
    }

    async fn download(&self, file: &FileRef) -> Result<Vec<u8>, AfterimageError> {
        self.downloads
            .lock()
            .await
            .get(&file.0)
            .cloned()
            .ok_or_else(|| AfterimageError::gateway(format!("mock file {file} not available")))
    }
}
