use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use rand::Rng;
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::TimerError;
use crate::notify::NotificationDispatcher;
use crate::session::{FlushReport, SessionLogger, SessionRecord};

use super::{RunState, TimerConfiguration, TimerEngine, TimerEvent, TimerSnapshot};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// What subscribers of a [`TimerController`] receive.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimerUpdate {
    Event { event: TimerEvent },
    Heartbeat { snapshot: TimerSnapshot },
    /// Sessions that will never reach the backend.
    Unrecorded { count: usize },
}

/// Drives a [`TimerEngine`] once per second and fans its events out to the
/// session logger, the notification dispatcher and subscribers.
pub struct TimerController<C: Clock> {
    engine: Arc<Mutex<TimerEngine<C>>>,
    logger: Arc<SessionLogger>,
    notifier: Arc<NotificationDispatcher>,
    updates: broadcast::Sender<TimerUpdate>,
    records: mpsc::UnboundedSender<SessionRecord>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    flusher: Arc<Mutex<Option<JoinHandle<()>>>>,
    shutdown: CancellationToken,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
    flush_interval: Duration,
}

impl<C: Clock> Clone for TimerController<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            logger: self.logger.clone(),
            notifier: self.notifier.clone(),
            updates: self.updates.clone(),
            records: self.records.clone(),
            ticker: self.ticker.clone(),
            flusher: self.flusher.clone(),
            shutdown: self.shutdown.clone(),
            tick_interval: self.tick_interval,
            heartbeat_every_ticks: self.heartbeat_every_ticks,
            flush_interval: self.flush_interval,
        }
    }
}

impl<C: Clock> TimerController<C> {
    /// Must be called inside a tokio runtime: session records are delivered
    /// by a task spawned here, one at a time and in the order they were made.
    pub fn new(
        clock: C,
        configuration: TimerConfiguration,
        logger: Arc<SessionLogger>,
        notifier: Arc<NotificationDispatcher>,
        flush_interval: Duration,
    ) -> Self {
        let debug_mode = std::env::var("STUDY_GUARDIAN_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (records, pending) = mpsc::unbounded_channel();

        tokio::spawn(deliver_records(
            pending,
            logger.clone(),
            notifier.clone(),
            updates.clone(),
        ));

        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new(clock, configuration))),
            logger,
            notifier,
            updates,
            records,
            ticker: Arc::new(Mutex::new(None)),
            flusher: Arc::new(Mutex::new(None)),
            shutdown: CancellationToken::new(),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
            flush_interval,
        }
    }

    pub fn with_heartbeat_every(mut self, ticks: u32) -> Self {
        self.heartbeat_every_ticks = ticks.max(1);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerUpdate> {
        self.updates.subscribe()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        self.engine.lock().await.snapshot()
    }

    pub async fn start(&self, configuration: TimerConfiguration) -> Result<TimerSnapshot, TimerError> {
        self.apply(true, move |engine| engine.start(configuration)).await
    }

    pub async fn pause(&self) -> Result<TimerSnapshot, TimerError> {
        self.apply(false, |engine| engine.pause()).await
    }

    pub async fn resume(&self) -> Result<TimerSnapshot, TimerError> {
        self.apply(false, |engine| engine.resume()).await
    }

    pub async fn stop(&self) -> Result<TimerSnapshot, TimerError> {
        self.apply(true, |engine| engine.stop()).await
    }

    pub async fn advance(&self) -> Result<TimerSnapshot, TimerError> {
        self.apply(true, |engine| engine.advance()).await
    }

    pub async fn skip(&self) -> Result<TimerSnapshot, TimerError> {
        self.apply(true, |engine| engine.skip()).await
    }

    /// Redelivers queued records now and warns about any that were dropped.
    pub async fn flush_now(&self) -> anyhow::Result<FlushReport> {
        flush_and_report(&self.logger, &self.notifier, &self.updates).await
    }

    /// Flushes the local queue once right away, then on a jittered interval
    /// until [`TimerController::shutdown`].
    pub async fn start_background_flush(&self) {
        let mut guard = self.flusher.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }

        let logger = self.logger.clone();
        let notifier = self.notifier.clone();
        let updates = self.updates.clone();
        let shutdown = self.shutdown.clone();
        let base = self.flush_interval;

        let handle = tokio::spawn(async move {
            if let Err(err) = flush_and_report(&logger, &notifier, &updates).await {
                warn!("Start-up session flush failed: {err:#}");
            }

            loop {
                let delay = jittered(base);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = time::sleep(delay) => {}
                }
                if let Err(err) = flush_and_report(&logger, &notifier, &updates).await {
                    warn!("Background session flush failed: {err:#}");
                }
            }
            debug!("Background flush stopped");
        });

        *guard = Some(handle);
    }

    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.flusher.lock().await.take() {
            handle.abort();
        }
        self.notifier.stop_alerts();
        info!("Timer controller shut down");
    }

    /// Runs one engine operation. The ticker lock is held throughout so the
    /// ticker always matches the run state the operation left behind.
    async fn apply<F>(&self, silence_alerts: bool, operation: F) -> Result<TimerSnapshot, TimerError>
    where
        F: FnOnce(&mut TimerEngine<C>) -> Result<Vec<TimerEvent>, TimerError>,
    {
        let mut ticker = self.ticker.lock().await;

        let (events, snapshot) = {
            let mut engine = self.engine.lock().await;
            let events = operation(&mut engine)?;
            (events, engine.snapshot())
        };

        if silence_alerts {
            self.notifier.stop_alerts();
        }
        route_events(&self.records, &self.notifier, &self.updates, events);

        if let Some(handle) = ticker.take() {
            handle.abort();
        }
        if snapshot.state.run_state == RunState::Running {
            *ticker = Some(self.spawn_ticker());
        }

        Ok(snapshot)
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let notifier = self.notifier.clone();
        let updates = self.updates.clone();
        let records = self.records.clone();
        let shutdown = self.shutdown.clone();
        let heartbeat_every = self.heartbeat_every_ticks;

        // Anchored now, not when the task is first polled. Late ticks are
        // delivered one after another so every elapsed second is counted.
        let mut interval =
            time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        tokio::spawn(async move {
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let (events, snapshot) = {
                    let mut guard = engine.lock().await;
                    if guard.run_state() != RunState::Running {
                        break;
                    }
                    let events = guard.tick();
                    (events, guard.snapshot())
                };

                route_events(&records, &notifier, &updates, events);

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    let _ = updates.send(TimerUpdate::Heartbeat {
                        snapshot: snapshot.clone(),
                    });
                }

                if snapshot.state.run_state != RunState::Running {
                    break;
                }
            }
        })
    }
}

fn route_events(
    records: &mpsc::UnboundedSender<SessionRecord>,
    notifier: &NotificationDispatcher,
    updates: &broadcast::Sender<TimerUpdate>,
    events: Vec<TimerEvent>,
) {
    for event in events {
        debug!("Timer event: {}", event.name());

        if let Some(record) = event.session_record() {
            if records.send(record.clone()).is_err() {
                error!("Session {} dropped: delivery task is gone", record.idempotency_key);
            }
        }

        notifier.handle(&event);
        // No subscribers is fine.
        let _ = updates.send(TimerUpdate::Event { event });
    }
}

async fn deliver_records(
    mut pending: mpsc::UnboundedReceiver<SessionRecord>,
    logger: Arc<SessionLogger>,
    notifier: Arc<NotificationDispatcher>,
    updates: broadcast::Sender<TimerUpdate>,
) {
    while let Some(record) = pending.recv().await {
        if let Err(fallback) = logger.record(record).await {
            if fallback.queued {
                info!("Session {} queued for redelivery", fallback.key);
            } else {
                error!("Session {} was not recorded: {}", fallback.key, fallback.reason);
                warn_unrecorded(&notifier, &updates, 1);
            }
        }
    }
    debug!("Session delivery stopped");
}

async fn flush_and_report(
    logger: &SessionLogger,
    notifier: &NotificationDispatcher,
    updates: &broadcast::Sender<TimerUpdate>,
) -> anyhow::Result<FlushReport> {
    let report = logger.flush().await?;
    warn_unrecorded(notifier, updates, report.exhausted.len());
    Ok(report)
}

fn warn_unrecorded(
    notifier: &NotificationDispatcher,
    updates: &broadcast::Sender<TimerUpdate>,
    count: usize,
) {
    if count == 0 {
        return;
    }
    notifier.warn_unrecorded(count);
    let _ = updates.send(TimerUpdate::Unrecorded { count });
}

/// `base` plus or minus up to a tenth, so many clients do not flush in step.
fn jittered(base: Duration) -> Duration {
    let spread = base.as_millis() as u64 / 10;
    if spread == 0 {
        return base;
    }
    let offset = rand::thread_rng().gen_range(0..=spread * 2);
    base - Duration::from_millis(spread) + Duration::from_millis(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_a_tenth() {
        let base = Duration::from_secs(60);
        for _ in 0..100 {
            let delay = jittered(base);
            assert!(delay >= Duration::from_secs(54));
            assert!(delay <= Duration::from_secs(66));
        }
        assert_eq!(jittered(Duration::from_millis(5)), Duration::from_millis(5));
    }
}
