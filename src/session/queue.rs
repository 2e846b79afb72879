use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::SessionRecord;

/// A session record waiting for redelivery.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedRecord {
    pub record: SessionRecord,
    /// Delivery attempts so far, including the one that queued the record.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub queued_at: DateTime<Utc>,
}

/// Durable store for records the backend has not acknowledged yet.
#[async_trait]
pub trait LocalQueue: Send + Sync {
    /// Appends a record with one failed attempt. Returns `false` if a record
    /// with the same idempotency key is already queued.
    async fn enqueue(&self, record: &SessionRecord, error: &str) -> Result<bool>;

    /// All queued records, oldest first. Records stay queued until removed.
    async fn drain(&self) -> Result<Vec<QueuedRecord>>;

    async fn remove(&self, key: Uuid) -> Result<()>;

    /// Counts one more failed attempt and returns the new total.
    async fn record_failure(&self, key: Uuid, error: &str) -> Result<u32>;

    async fn len(&self) -> Result<usize>;
}

/// In-process queue for hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<QueuedRecord>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, VecDeque<QueuedRecord>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LocalQueue for MemoryQueue {
    async fn enqueue(&self, record: &SessionRecord, error: &str) -> Result<bool> {
        let mut items = self.items();
        if items
            .iter()
            .any(|item| item.record.idempotency_key == record.idempotency_key)
        {
            return Ok(false);
        }
        items.push_back(QueuedRecord {
            record: record.clone(),
            attempts: 1,
            last_error: Some(error.to_string()),
            queued_at: Utc::now(),
        });
        Ok(true)
    }

    async fn drain(&self) -> Result<Vec<QueuedRecord>> {
        Ok(self.items().iter().cloned().collect())
    }

    async fn remove(&self, key: Uuid) -> Result<()> {
        self.items().retain(|item| item.record.idempotency_key != key);
        Ok(())
    }

    async fn record_failure(&self, key: Uuid, error: &str) -> Result<u32> {
        let mut items = self.items();
        let item = items
            .iter_mut()
            .find(|item| item.record.idempotency_key == key)
            .ok_or_else(|| anyhow!("session {key} is not queued"))?;
        item.attempts += 1;
        item.last_error = Some(error.to_string());
        Ok(item.attempts)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.items().len())
    }
}
