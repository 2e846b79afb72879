pub mod api;
#[cfg(feature = "audio")]
pub mod audio;
pub mod clock;
pub mod db;
pub mod error;
pub mod notify;
pub mod session;
pub mod settings;
pub mod timer;
mod utils;

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context;

pub use api::{HttpApi, PresetSource, SessionSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use db::Database;
pub use error::{ApiError, NotificationError, QueueFallback, TimerError};
pub use notify::{BannerPresenter, DesktopNotifier, NotificationDispatcher};
pub use session::{Ack, FlushReport, LocalQueue, SessionLogger, SessionRecord};
pub use settings::{Settings, SettingsStore};
pub use timer::{
    AdvanceMode, Phase, RunState, TimerConfiguration, TimerController, TimerEngine, TimerEvent,
    TimerSnapshot, TimerState, TimerUpdate,
};

const APP_NAME: &str = "Study Guardian";

/// Sets up `env_logger` from `RUST_LOG`, defaulting to `info`. Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Everything a host shell needs, wired from one data directory.
pub struct StudyGuardian {
    pub settings: Arc<SettingsStore>,
    pub database: Database,
    pub api: Arc<HttpApi>,
    pub timer: TimerController<SystemClock>,
}

impl StudyGuardian {
    /// Opens settings and the local queue under `data_dir`, builds the HTTP
    /// client and starts the background flush. Must be called inside a tokio
    /// runtime.
    ///
    /// `banner` is the host's in-app banner. Without one, warnings that would
    /// go to a banner use the system notification instead.
    pub async fn open(
        data_dir: &Path,
        banner: Option<Arc<dyn BannerPresenter>>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
        let current = settings.settings();

        let database = Database::new(data_dir.join("study-guardian.sqlite3"))?;
        let api = Arc::new(HttpApi::from_settings(&current.api)?);

        let logger = Arc::new(SessionLogger::new(
            api.clone(),
            Arc::new(database.clone()),
            current.logger.max_attempts,
        ));

        let notifier = NotificationDispatcher::new(current.notifications.clone())
            .with_system_notifier(Arc::new(DesktopNotifier::new(APP_NAME)));
        let notifier = match banner {
            Some(banner) => notifier.with_banner(banner),
            None => notifier,
        };
        #[cfg(feature = "audio")]
        let notifier = notifier.with_alert_player(Arc::new(audio::ChimePlayer::new()));

        let timer = TimerController::new(
            SystemClock::new(),
            current.timer.clone(),
            logger,
            Arc::new(notifier),
            Duration::from_secs(current.logger.flush_interval_secs.max(1)),
        );
        // Sessions left over from the last run go out first.
        timer.start_background_flush().await;

        log::info!("Study Guardian ready (data dir {})", data_dir.display());

        Ok(Self {
            settings,
            database,
            api,
            timer,
        })
    }

    /// Fetches presets and turns the one with `preset_id` into a timer
    /// configuration using the stored advance mode.
    pub async fn configuration_for_preset(
        &self,
        preset_id: &str,
    ) -> anyhow::Result<TimerConfiguration> {
        let presets = self.api.fetch_presets().await?;
        let preset = presets
            .into_iter()
            .find(|preset| preset.id == preset_id)
            .ok_or_else(|| anyhow::anyhow!("unknown preset {preset_id}"))?;
        Ok(preset.configuration(self.settings.timer().advance_mode())?)
    }

    pub async fn shutdown(&self) {
        self.timer.shutdown().await;
    }
}
