use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::api::SessionSink;
use crate::error::QueueFallback;

use super::{LocalQueue, SessionRecord};

const ACK_MEMORY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Ack {
    Accepted,
    /// The record had already been delivered under the same key.
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    pub delivered: usize,
    pub remaining: usize,
    /// Records dropped after running out of attempts.
    pub exhausted: Vec<SessionRecord>,
}

/// Recently acknowledged keys, oldest evicted first.
#[derive(Default)]
struct AckMemory {
    order: VecDeque<Uuid>,
    keys: HashSet<Uuid>,
}

impl AckMemory {
    fn contains(&self, key: &Uuid) -> bool {
        self.keys.contains(key)
    }

    fn insert(&mut self, key: Uuid) {
        if !self.keys.insert(key) {
            return;
        }
        self.order.push_back(key);
        if self.order.len() > ACK_MEMORY {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
    }
}

/// Delivers session records to the backend, falling back to a local queue.
pub struct SessionLogger {
    sink: Arc<dyn SessionSink>,
    queue: Arc<dyn LocalQueue>,
    max_attempts: u32,
    acknowledged: Mutex<AckMemory>,
    flush_lock: AsyncMutex<()>,
}

impl SessionLogger {
    pub fn new(sink: Arc<dyn SessionSink>, queue: Arc<dyn LocalQueue>, max_attempts: u32) -> Self {
        Self {
            sink,
            queue,
            max_attempts: max_attempts.max(1),
            acknowledged: Mutex::new(AckMemory::default()),
            flush_lock: AsyncMutex::new(()),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn record(&self, record: SessionRecord) -> Result<Ack, QueueFallback> {
        let key = record.idempotency_key;
        if self.is_acknowledged(&key) {
            debug!("Session {key} already delivered; not resubmitting");
            return Ok(Ack::Duplicate);
        }

        let reason = match self.sink.submit(&record).await {
            Ok(ack) => {
                self.remember(key);
                return Ok(ack);
            }
            Err(err) => err.to_string(),
        };

        if self.max_attempts <= 1 {
            error!("Session {key} was not delivered and retries are disabled: {reason}");
            return Err(QueueFallback {
                key,
                reason,
                queued: false,
            });
        }

        warn!("Session {key} submission failed, queueing locally: {reason}");
        match self.queue.enqueue(&record, &reason).await {
            Ok(_) => Err(QueueFallback {
                key,
                reason,
                queued: true,
            }),
            Err(queue_err) => {
                error!("Session {key} could not be queued either: {queue_err:#}");
                Err(QueueFallback {
                    key,
                    reason: format!("{reason}; local queue: {queue_err}"),
                    queued: false,
                })
            }
        }
    }

    /// Redelivers queued records oldest first. Concurrent calls run one after
    /// the other.
    pub async fn flush(&self) -> Result<FlushReport> {
        let _guard = self.flush_lock.lock().await;

        let pending = self.queue.drain().await?;
        let mut report = FlushReport::default();

        for item in pending {
            let key = item.record.idempotency_key;
            if self.is_acknowledged(&key) {
                self.queue.remove(key).await?;
                report.delivered += 1;
                continue;
            }

            match self.sink.submit(&item.record).await {
                Ok(_) => {
                    self.remember(key);
                    self.queue.remove(key).await?;
                    report.delivered += 1;
                }
                Err(err) => {
                    let attempts = self.queue.record_failure(key, &err.to_string()).await?;
                    if attempts >= self.max_attempts {
                        error!(
                            "Giving up on session {key} after {attempts} attempts: {err}"
                        );
                        self.queue.remove(key).await?;
                        report.exhausted.push(item.record);
                        continue;
                    }
                    warn!("Redelivery of session {key} failed (attempt {attempts}): {err}");
                    break;
                }
            }
        }

        report.remaining = self.queue.len().await?;
        if report.delivered > 0 || !report.exhausted.is_empty() {
            info!(
                "Session queue flushed: {} delivered, {} dropped, {} pending",
                report.delivered,
                report.exhausted.len(),
                report.remaining
            );
        }
        Ok(report)
    }

    fn is_acknowledged(&self, key: &Uuid) -> bool {
        self.acknowledged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(key)
    }

    fn remember(&self, key: Uuid) {
        self.acknowledged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key);
    }
}
