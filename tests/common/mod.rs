#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use study_guardian::{
    notify::{AlertKind, AlertPlayer, BannerPresenter},
    Ack, ApiError, NotificationError, SessionRecord, SessionSink,
};
use tokio::sync::mpsc;

/// Backend double keeping one copy per idempotency key.
pub struct FakeBackend {
    offline: AtomicBool,
    stored: Mutex<Vec<SessionRecord>>,
    deliveries: mpsc::UnboundedSender<SessionRecord>,
}

impl FakeBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionRecord>) {
        let (deliveries, rx) = mpsc::unbounded_channel();
        let backend = Self {
            offline: AtomicBool::new(false),
            stored: Mutex::new(Vec::new()),
            deliveries,
        };
        (backend, rx)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Vec<SessionRecord> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionSink for FakeBackend {
    async fn submit(&self, record: &SessionRecord) -> Result<Ack, ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("connection refused".into()));
        }
        let mut stored = self.stored.lock().unwrap();
        if stored
            .iter()
            .any(|r| r.idempotency_key == record.idempotency_key)
        {
            return Ok(Ack::Duplicate);
        }
        stored.push(record.clone());
        let _ = self.deliveries.send(record.clone());
        Ok(Ack::Accepted)
    }
}

#[derive(Default)]
pub struct BannerLog {
    pub banners: Mutex<Vec<(String, String)>>,
}

impl BannerPresenter for BannerLog {
    fn show_banner(&self, title: &str, message: &str) -> Result<(), NotificationError> {
        self.banners
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct AlertLog {
    pub played: Mutex<Vec<AlertKind>>,
    pub stops: AtomicUsize,
}

impl AlertLog {
    pub fn played(&self) -> Vec<AlertKind> {
        self.played.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AlertPlayer for AlertLog {
    fn play_alert(&self, kind: AlertKind) -> Result<(), NotificationError> {
        self.played.lock().unwrap().push(kind);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
