use serde::{Deserialize, Serialize};

use crate::error::TimerError;
use crate::timer::{AdvanceMode, TimerConfiguration};

/// Named timer settings stored on the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub work_duration_seconds: u32,
    pub short_break_duration_seconds: u32,
    pub long_break_duration_seconds: u32,
    pub cycles_before_long_break: u32,
}

impl Preset {
    /// Validated configuration tagged with this preset's id.
    pub fn configuration(&self, advance_mode: AdvanceMode) -> Result<TimerConfiguration, TimerError> {
        Ok(TimerConfiguration::new(
            self.work_duration_seconds,
            self.short_break_duration_seconds,
            self.long_break_duration_seconds,
            self.cycles_before_long_break,
        )?
        .with_advance_mode(advance_mode)
        .with_preset_id(self.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_configuration() {
        let json = r#"{"id":"deep","name":"Deep work","workDurationSeconds":3000,
            "shortBreakDurationSeconds":600,"longBreakDurationSeconds":1200,"cyclesBeforeLongBreak":3}"#;
        let preset: Preset = serde_json::from_str(json).unwrap();
        let config = preset.configuration(AdvanceMode::Manual).unwrap();
        assert_eq!(config.work_duration_seconds(), 3000);
        assert_eq!(config.cycles_before_long_break(), 3);
        assert_eq!(config.preset_id(), Some("deep"));
        assert_eq!(config.advance_mode(), AdvanceMode::Manual);
    }

    #[test]
    fn invalid_preset_is_rejected() {
        let preset = Preset {
            id: "broken".into(),
            name: "Broken".into(),
            work_duration_seconds: 0,
            short_break_duration_seconds: 300,
            long_break_duration_seconds: 900,
            cycles_before_long_break: 4,
        };
        assert!(matches!(
            preset.configuration(AdvanceMode::Auto),
            Err(TimerError::ConfigurationInvalid(_))
        ));
    }
}
