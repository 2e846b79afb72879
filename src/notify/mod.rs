//! Phase-end notifications.
//!
//! The dispatcher talks to three optional collaborators supplied by the host:
//! an alert player, an in-app banner and the system notification centre.

pub mod desktop;
pub mod dispatcher;

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

pub use desktop::DesktopNotifier;
pub use dispatcher::NotificationDispatcher;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    WorkFinished,
    BreakFinished,
    /// Sessions could not be delivered.
    Warning,
}

pub trait AlertPlayer: Send + Sync {
    fn play_alert(&self, kind: AlertKind) -> Result<(), NotificationError>;

    /// Cuts off a sound that is still playing.
    fn stop(&self) {}
}

pub trait BannerPresenter: Send + Sync {
    fn show_banner(&self, title: &str, message: &str) -> Result<(), NotificationError>;
}

pub trait SystemNotifier: Send + Sync {
    fn show_system_notification(&self, title: &str, message: &str) -> Result<(), NotificationError>;
}
