use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::error::NotificationError;
use crate::settings::NotificationSettings;
use crate::timer::{Phase, TimerEvent};

use super::{AlertKind, AlertPlayer, BannerPresenter, SystemNotifier};

const ENABLE_LOGS: bool = true;
const UNRECORDED_TITLE: &str = "Sync problem";

use crate::{log_info, log_warn};

/// Turns timer events into alerts, banners and system notifications.
///
/// Every target is best effort: a failing target is logged and skipped.
/// Only one repeating alert plays at a time; starting a new one cancels the
/// previous.
pub struct NotificationDispatcher {
    alert_player: Option<Arc<dyn AlertPlayer>>,
    banner: Option<Arc<dyn BannerPresenter>>,
    system: Option<Arc<dyn SystemNotifier>>,
    settings: NotificationSettings,
    active_alert: Mutex<Option<CancellationToken>>,
}

impl NotificationDispatcher {
    pub fn new(settings: NotificationSettings) -> Self {
        Self {
            alert_player: None,
            banner: None,
            system: None,
            settings,
            active_alert: Mutex::new(None),
        }
    }

    pub fn with_alert_player(mut self, player: Arc<dyn AlertPlayer>) -> Self {
        self.alert_player = Some(player);
        self
    }

    pub fn with_banner(mut self, banner: Arc<dyn BannerPresenter>) -> Self {
        self.banner = Some(banner);
        self
    }

    pub fn with_system_notifier(mut self, system: Arc<dyn SystemNotifier>) -> Self {
        self.system = Some(system);
        self
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    pub fn handle(&self, event: &TimerEvent) {
        match event {
            TimerEvent::PhaseCompleted { record, next_phase } => {
                let kind = if record.phase.is_break() {
                    AlertKind::BreakFinished
                } else {
                    AlertKind::WorkFinished
                };
                let title = format!("{} complete", record.phase.label());
                let message = completion_message(*next_phase);

                self.start_alert(kind);
                self.banner(&title, message);
                self.system_notification(&title, message);
            }
            TimerEvent::PhaseReady { phase, .. } => {
                let title = format!("Ready for {}", phase.label().to_lowercase());
                self.banner_or_system(&title, "Start the next phase when you're ready.");
            }
            _ => {}
        }
    }

    /// Surfaces sessions that could not be delivered to the backend: a
    /// banner when one is available, the system notification otherwise, and a
    /// single warning sound.
    pub fn warn_unrecorded(&self, count: usize) {
        if count == 0 {
            return;
        }
        let message = if count == 1 {
            "One past session may not have been recorded.".to_string()
        } else {
            format!("{count} past sessions may not have been recorded.")
        };

        self.banner_or_system(UNRECORDED_TITLE, &message);

        if let Some(player) = self.alert_player.as_ref().filter(|_| self.settings.sound_enabled) {
            report("alert", player.play_alert(AlertKind::Warning));
        }
    }

    /// Cancels the repeating alert and cuts off any sound still playing.
    pub fn stop_alerts(&self) {
        let mut guard = self
            .active_alert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = guard.take() {
            token.cancel();
        }
        if let Some(player) = &self.alert_player {
            player.stop();
        }
    }

    fn start_alert(&self, kind: AlertKind) {
        let Some(player) = self.alert_player.clone().filter(|_| self.settings.sound_enabled) else {
            return;
        };

        let mut guard = self
            .active_alert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = guard.take() {
            previous.cancel();
        }

        let repeats = self.settings.alert_repeat_count.max(1);
        let runtime = match Handle::try_current() {
            Ok(handle) if repeats > 1 => handle,
            _ => {
                report("alert", player.play_alert(kind));
                return;
            }
        };

        let token = CancellationToken::new();
        *guard = Some(token.clone());
        let interval = Duration::from_secs(self.settings.alert_repeat_interval_secs);

        runtime.spawn(async move {
            for round in 0..repeats {
                if round > 0 {
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                if token.is_cancelled() {
                    return;
                }
                report("alert", player.play_alert(kind));
            }
            log_info!("Alert {kind:?} finished after {repeats} rounds");
        });
    }

    fn banner(&self, title: &str, message: &str) {
        if let Some(banner) = self.banner.as_ref().filter(|_| self.settings.banner_enabled) {
            report("banner", banner.show_banner(title, message));
        }
    }

    /// Banner if the host shows them, otherwise the system notification.
    fn banner_or_system(&self, title: &str, message: &str) {
        match self.banner.as_ref().filter(|_| self.settings.banner_enabled) {
            Some(banner) => report("banner", banner.show_banner(title, message)),
            None => self.system_notification(title, message),
        }
    }

    fn system_notification(&self, title: &str, message: &str) {
        if let Some(system) = self.system.as_ref().filter(|_| self.settings.system_enabled) {
            report("system notification", system.show_system_notification(title, message));
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        self.stop_alerts();
    }
}

fn completion_message(next: Phase) -> &'static str {
    match next {
        Phase::Work => "Break's over. Time to focus.",
        Phase::ShortBreak => "Nice work! Take a short break.",
        Phase::LongBreak => "Great job! Enjoy a long break.",
    }
}

fn report(target: &str, result: Result<(), NotificationError>) {
    if let Err(err) = result {
        log_warn!("Notification target {target} failed: {err}");
    }
}
