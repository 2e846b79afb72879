use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::timer::TimerConfiguration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub sound_enabled: bool,
    pub banner_enabled: bool,
    pub system_enabled: bool,
    /// How many times a phase-end alert plays. 1 disables repetition.
    pub alert_repeat_count: u32,
    pub alert_repeat_interval_secs: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            banner_enabled: true,
            system_enabled: true,
            alert_repeat_count: 3,
            alert_repeat_interval_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerSettings {
    /// Delivery attempts per session record before it is dropped and reported.
    pub max_attempts: u32,
    pub flush_interval_secs: u64,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            flush_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api: ApiSettings,
    pub timer: TimerConfiguration,
    pub notifications: NotificationSettings,
    pub logger: LoggerSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> Settings {
        self.read().clone()
    }

    pub fn timer(&self) -> TimerConfiguration {
        self.read().timer.clone()
    }

    pub fn notifications(&self) -> NotificationSettings {
        self.read().notifications.clone()
    }

    pub fn update_timer(&self, timer: TimerConfiguration) -> Result<()> {
        self.update(|settings| settings.timer = timer)
    }

    pub fn update_notifications(&self, notifications: NotificationSettings) -> Result<()> {
        self.update(|settings| settings.notifications = notifications)
    }

    pub fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut guard = self.write();
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
