mod common;

use std::{sync::Arc, time::Duration};

use common::{AlertLog, BannerLog, FakeBackend};
use study_guardian::{
    notify::AlertKind, session::MemoryQueue, settings::NotificationSettings, AdvanceMode, LocalQueue,
    NotificationDispatcher, Phase, RunState, SessionLogger, SystemClock, TimerConfiguration,
    TimerController, TimerEvent, TimerUpdate,
};
use tokio::sync::broadcast::{self, error::RecvError};

struct Harness {
    controller: TimerController<SystemClock>,
    backend: Arc<FakeBackend>,
    deliveries: tokio::sync::mpsc::UnboundedReceiver<study_guardian::SessionRecord>,
    queue: Arc<MemoryQueue>,
    banners: Arc<BannerLog>,
    alerts: Arc<AlertLog>,
}

fn harness() -> Harness {
    let (backend, deliveries) = FakeBackend::new();
    let backend = Arc::new(backend);
    let queue = Arc::new(MemoryQueue::new());
    let banners = Arc::new(BannerLog::default());
    let alerts = Arc::new(AlertLog::default());
    let logger = Arc::new(SessionLogger::new(backend.clone(), queue.clone(), 2));
    let notifier = NotificationDispatcher::new(NotificationSettings::default())
        .with_banner(banners.clone())
        .with_alert_player(alerts.clone());
    let controller = TimerController::new(
        SystemClock::new(),
        TimerConfiguration::standard(),
        logger,
        Arc::new(notifier),
        Duration::from_secs(60),
    )
    .with_heartbeat_every(1000);

    Harness {
        controller,
        backend,
        deliveries,
        queue,
        banners,
        alerts,
    }
}

fn short_config(mode: AdvanceMode) -> TimerConfiguration {
    TimerConfiguration::new(3, 2, 4, 2)
        .unwrap()
        .with_advance_mode(mode)
}

/// Waits for the next timer event, skipping heartbeats.
async fn next_event(rx: &mut broadcast::Receiver<TimerUpdate>) -> TimerEvent {
    loop {
        match rx.recv().await {
            Ok(TimerUpdate::Event { event }) => return event,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("controller channel closed"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn ticker_drives_phases_and_logs_records() {
    let mut h = harness();
    let mut rx = h.controller.subscribe();

    h.controller.start(short_config(AdvanceMode::Auto)).await.unwrap();

    assert!(matches!(next_event(&mut rx).await, TimerEvent::Started { phase: Phase::Work, .. }));
    let TimerEvent::PhaseCompleted { record, next_phase } = next_event(&mut rx).await else {
        panic!("expected the work phase to complete");
    };
    assert_eq!(next_phase, Phase::ShortBreak);
    assert!(record.completed_normally);
    assert_eq!(record.actual_duration_seconds, 3);
    assert!(matches!(
        next_event(&mut rx).await,
        TimerEvent::PhaseStarted { phase: Phase::ShortBreak, run_state: RunState::Running, .. }
    ));

    let delivered = h.deliveries.recv().await.unwrap();
    assert_eq!(delivered.idempotency_key, record.idempotency_key);

    // Banner for the finished work phase.
    assert_eq!(h.banners.banners.lock().unwrap().len(), 1);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_and_resume_continues() {
    let h = harness();
    let mut rx = h.controller.subscribe();

    h.controller.start(short_config(AdvanceMode::Auto)).await.unwrap();
    let snapshot = h.controller.pause().await.unwrap();
    assert_eq!(snapshot.state.run_state, RunState::Paused);
    assert_eq!(snapshot.state.remaining_seconds, 3);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.controller.get_snapshot().await.state.remaining_seconds, 3);

    h.controller.resume().await.unwrap();
    loop {
        if let TimerEvent::PhaseCompleted { record, .. } = next_event(&mut rx).await {
            assert_eq!(record.phase, Phase::Work);
            break;
        }
    }

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_mode_waits_for_advance() {
    let h = harness();
    let mut rx = h.controller.subscribe();

    h.controller.start(short_config(AdvanceMode::Manual)).await.unwrap();
    loop {
        if let TimerEvent::PhaseReady { phase, .. } = next_event(&mut rx).await {
            assert_eq!(phase, Phase::ShortBreak);
            break;
        }
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = h.controller.get_snapshot().await;
    assert_eq!(snapshot.state.run_state, RunState::Idle);
    assert!(snapshot.state.awaiting_advance);
    assert_eq!(snapshot.state.remaining_seconds, 2);

    h.controller.advance().await.unwrap();
    loop {
        if let TimerEvent::PhaseCompleted { record, .. } = next_event(&mut rx).await {
            assert_eq!(record.phase, Phase::ShortBreak);
            break;
        }
    }

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_mid_phase_submits_partial_record() {
    let mut h = harness();

    h.controller.start(TimerConfiguration::standard()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10_500)).await;

    let snapshot = h.controller.stop().await.unwrap();
    assert_eq!(snapshot.state.run_state, RunState::Idle);
    assert_eq!(snapshot.state.remaining_seconds, 1500);

    let record = h.deliveries.recv().await.unwrap();
    assert!(!record.completed_normally);
    assert_eq!(record.actual_duration_seconds, 10);

    assert!(h.controller.pause().await.is_err());
    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn offline_records_are_flushed_later() {
    let mut h = harness();
    h.backend.set_offline(true);

    h.controller.start(TimerConfiguration::standard()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    h.controller.stop().await.unwrap();

    // The submission runs on its own task.
    while h.queue.len().await.unwrap() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    h.backend.set_offline(false);
    let report = h.controller.flush_now().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(h.deliveries.recv().await.unwrap().actual_duration_seconds, 2);
    assert_eq!(h.backend.stored().len(), 1);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_records_raise_a_banner() {
    let h = harness();
    h.backend.set_offline(true);

    h.controller.start(TimerConfiguration::standard()).await.unwrap();
    h.controller.stop().await.unwrap();
    while h.queue.len().await.unwrap() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Logger allows two attempts; the queued one was the first.
    let mut rx = h.controller.subscribe();
    let report = h.controller.flush_now().await.unwrap();
    assert_eq!(report.exhausted.len(), 1);
    assert!(matches!(rx.try_recv(), Ok(TimerUpdate::Unrecorded { count: 1 })));
    assert_eq!(h.alerts.played(), vec![AlertKind::Warning]);

    let banners = h.banners.banners.lock().unwrap().clone();
    assert_eq!(banners.len(), 1);
    assert!(banners[0].1.contains("may not have been recorded"));

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn background_flush_delivers_leftovers_on_start() {
    let mut h = harness();
    h.backend.set_offline(true);

    h.controller.start(TimerConfiguration::standard()).await.unwrap();
    h.controller.stop().await.unwrap();
    while h.queue.len().await.unwrap() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    h.backend.set_offline(false);
    h.controller.start_background_flush().await;

    let record = h.deliveries.recv().await.unwrap();
    assert!(!record.completed_normally);
    assert_eq!(h.queue.len().await.unwrap(), 0);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn background_flush_announces_dropped_records() {
    let h = harness();
    h.backend.set_offline(true);

    h.controller.start(TimerConfiguration::standard()).await.unwrap();
    h.controller.stop().await.unwrap();
    while h.queue.len().await.unwrap() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut rx = h.controller.subscribe();
    h.controller.start_background_flush().await;
    loop {
        match rx.recv().await.unwrap() {
            TimerUpdate::Unrecorded { count } => {
                assert_eq!(count, 1);
                break;
            }
            _ => continue,
        }
    }
    assert_eq!(h.queue.len().await.unwrap(), 0);
    assert_eq!(h.banners.banners.lock().unwrap().len(), 1);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_operation_leaves_ringing_alert_alone() {
    let h = harness();
    let mut rx = h.controller.subscribe();
    let config = TimerConfiguration::new(3, 60, 60, 2).unwrap();

    h.controller.start(config.clone()).await.unwrap();
    loop {
        if let TimerEvent::PhaseCompleted { .. } = next_event(&mut rx).await {
            break;
        }
    }

    let stops_before = h.alerts.stops();
    assert!(h.controller.start(config).await.is_err());
    assert!(h.controller.advance().await.is_err());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.alerts.played(), vec![AlertKind::WorkFinished; 3]);
    assert_eq!(h.alerts.stops(), stops_before);

    h.controller.stop().await.unwrap();
    assert_eq!(h.alerts.stops(), stops_before + 1);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn late_ticks_catch_up_across_phases_in_order() {
    let h = harness();
    let mut rx = h.controller.subscribe();

    h.controller.start(short_config(AdvanceMode::Auto)).await.unwrap();
    let stalled_at = tokio::time::Instant::now();
    // The ticker has not run yet; eight seconds are owed at once.
    tokio::time::advance(Duration::from_millis(8_500)).await;

    assert!(matches!(next_event(&mut rx).await, TimerEvent::Started { .. }));
    let mut transitions = Vec::new();
    while transitions.len() < 6 {
        match next_event(&mut rx).await {
            TimerEvent::PhaseCompleted { record, next_phase } => {
                transitions.push(format!("completed {:?} {} -> {:?}", record.phase, record.cycle_index, next_phase));
            }
            TimerEvent::PhaseStarted { phase, cycle_index, .. } => {
                transitions.push(format!("started {phase:?} {cycle_index}"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert_eq!(
        transitions,
        vec![
            "completed Work 1 -> ShortBreak",
            "started ShortBreak 1",
            "completed ShortBreak 1 -> Work",
            "started Work 2",
            "completed Work 2 -> LongBreak",
            "started LongBreak 2",
        ]
    );
    // Caught up without waiting out another tick period per missed tick.
    assert!(stalled_at.elapsed() < Duration::from_secs(9));
    assert_eq!(h.controller.get_snapshot().await.state.remaining_seconds, 4);

    h.controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pause_and_resume_keep_the_countdown_alive() {
    let h = harness();
    let mut rx = h.controller.subscribe();

    h.controller
        .start(TimerConfiguration::new(2, 60, 60, 2).unwrap())
        .await
        .unwrap();
    h.controller.pause().await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..40 {
        let controller = h.controller.clone();
        tasks.push(tokio::spawn(async move {
            let _ = if i % 2 == 0 {
                controller.resume().await
            } else {
                controller.pause().await
            };
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    if h.controller.get_snapshot().await.state.run_state == RunState::Paused {
        h.controller.resume().await.unwrap();
    }

    let completed = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let TimerEvent::PhaseCompleted { record, .. } = next_event(&mut rx).await {
                return record;
            }
        }
    })
    .await
    .expect("running timer stopped counting down");
    assert_eq!(completed.phase, Phase::Work);

    h.controller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn offline_records_are_queued_in_the_order_they_were_made() {
    let h = harness();
    h.backend.set_offline(true);
    let mut rx = h.controller.subscribe();

    h.controller.start(TimerConfiguration::standard()).await.unwrap();
    for _ in 0..10 {
        h.controller.skip().await.unwrap();
    }

    let mut made = Vec::new();
    while made.len() < 10 {
        if let TimerEvent::PhaseAborted { record } = next_event(&mut rx).await {
            made.push(record.idempotency_key);
        }
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.queue.len().await.unwrap() < 10 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("records were not queued");

    let queued: Vec<_> = h
        .queue
        .drain()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.record.idempotency_key)
        .collect();
    assert_eq!(queued, made);

    h.controller.shutdown().await;
}
