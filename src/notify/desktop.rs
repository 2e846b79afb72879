//! System notifications through the platform's notification command.

use std::process::Command;

use log::debug;

use crate::error::NotificationError;

use super::SystemNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopBackend {
    /// macOS `osascript`
    Osascript,
    /// Linux `notify-send`
    NotifySend,
    /// Nothing usable was found
    Unsupported,
}

impl DesktopBackend {
    pub fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            Self::Osascript
        }

        #[cfg(target_os = "linux")]
        {
            if command_exists("notify-send") {
                Self::NotifySend
            } else {
                Self::Unsupported
            }
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            Self::Unsupported
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Osascript => "osascript",
            Self::NotifySend => "notify-send",
            Self::Unsupported => "unsupported",
        }
    }
}

#[cfg(target_os = "linux")]
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Quotes a string for an AppleScript string literal.
fn applescript_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub struct DesktopNotifier {
    backend: DesktopBackend,
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::with_backend(DesktopBackend::detect(), app_name)
    }

    pub fn with_backend(backend: DesktopBackend, app_name: impl Into<String>) -> Self {
        Self {
            backend,
            app_name: app_name.into(),
        }
    }

    pub fn backend(&self) -> DesktopBackend {
        self.backend
    }

    fn command(&self, title: &str, message: &str) -> Option<Command> {
        match self.backend {
            DesktopBackend::Osascript => {
                let script = format!(
                    "display notification {} with title {} subtitle {}",
                    applescript_quote(message),
                    applescript_quote(&self.app_name),
                    applescript_quote(title),
                );
                let mut cmd = Command::new("osascript");
                cmd.args(["-e", &script]);
                Some(cmd)
            }
            DesktopBackend::NotifySend => {
                let mut cmd = Command::new("notify-send");
                cmd.args(["--app-name", &self.app_name, title, message]);
                Some(cmd)
            }
            DesktopBackend::Unsupported => None,
        }
    }
}

impl SystemNotifier for DesktopNotifier {
    fn show_system_notification(&self, title: &str, message: &str) -> Result<(), NotificationError> {
        let mut cmd = self.command(title, message).ok_or_else(|| {
            NotificationError::Unavailable("no desktop notification backend".into())
        })?;

        debug!("Sending system notification via {}", self.backend.name());
        let status = cmd
            .status()
            .map_err(|e| NotificationError::Unavailable(format!("{}: {e}", self.backend.name())))?;
        if !status.success() {
            return Err(NotificationError::Failed(format!(
                "{} exited with {status}",
                self.backend.name()
            )));
        }
        Ok(())
    }
}
