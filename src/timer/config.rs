use serde::{Deserialize, Serialize};

use crate::error::TimerError;

use super::Phase;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AdvanceMode {
    /// The next phase starts as soon as the previous one completes.
    #[default]
    Auto,
    /// The engine goes idle after each phase and waits for `advance()`.
    Manual,
}

/// Durations and cycle structure of a focus session.
///
/// Only constructible through [`TimerConfiguration::new`] or deserialization,
/// both of which reject zero durations and fewer than two cycles per long
/// break.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "RawConfiguration")]
pub struct TimerConfiguration {
    work_duration_seconds: u32,
    short_break_duration_seconds: u32,
    long_break_duration_seconds: u32,
    cycles_before_long_break: u32,
    advance_mode: AdvanceMode,
    preset_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfiguration {
    work_duration_seconds: u32,
    short_break_duration_seconds: u32,
    long_break_duration_seconds: u32,
    cycles_before_long_break: u32,
    #[serde(default)]
    advance_mode: AdvanceMode,
    #[serde(default)]
    preset_id: Option<String>,
}

impl TryFrom<RawConfiguration> for TimerConfiguration {
    type Error = TimerError;

    fn try_from(raw: RawConfiguration) -> Result<Self, Self::Error> {
        let config = TimerConfiguration::new(
            raw.work_duration_seconds,
            raw.short_break_duration_seconds,
            raw.long_break_duration_seconds,
            raw.cycles_before_long_break,
        )?
        .with_advance_mode(raw.advance_mode);

        Ok(match raw.preset_id {
            Some(id) => config.with_preset_id(id),
            None => config,
        })
    }
}

impl TimerConfiguration {
    pub fn new(
        work_duration_seconds: u32,
        short_break_duration_seconds: u32,
        long_break_duration_seconds: u32,
        cycles_before_long_break: u32,
    ) -> Result<Self, TimerError> {
        let durations = [
            ("work", work_duration_seconds),
            ("short break", short_break_duration_seconds),
            ("long break", long_break_duration_seconds),
        ];
        for (name, seconds) in durations {
            if seconds == 0 {
                return Err(TimerError::ConfigurationInvalid(format!(
                    "{name} duration must be greater than zero"
                )));
            }
        }
        if cycles_before_long_break < 2 {
            return Err(TimerError::ConfigurationInvalid(format!(
                "cycles before long break must be at least 2, got {cycles_before_long_break}"
            )));
        }

        Ok(Self {
            work_duration_seconds,
            short_break_duration_seconds,
            long_break_duration_seconds,
            cycles_before_long_break,
            advance_mode: AdvanceMode::Auto,
            preset_id: None,
        })
    }

    /// 25 minutes of work, 5 minute short breaks, 15 minute long break every
    /// fourth cycle.
    pub fn standard() -> Self {
        Self {
            work_duration_seconds: 25 * 60,
            short_break_duration_seconds: 5 * 60,
            long_break_duration_seconds: 15 * 60,
            cycles_before_long_break: 4,
            advance_mode: AdvanceMode::Auto,
            preset_id: None,
        }
    }

    pub fn with_advance_mode(mut self, mode: AdvanceMode) -> Self {
        self.advance_mode = mode;
        self
    }

    pub fn with_preset_id(mut self, preset_id: impl Into<String>) -> Self {
        self.preset_id = Some(preset_id.into());
        self
    }

    pub fn work_duration_seconds(&self) -> u32 {
        self.work_duration_seconds
    }

    pub fn short_break_duration_seconds(&self) -> u32 {
        self.short_break_duration_seconds
    }

    pub fn long_break_duration_seconds(&self) -> u32 {
        self.long_break_duration_seconds
    }

    pub fn cycles_before_long_break(&self) -> u32 {
        self.cycles_before_long_break
    }

    pub fn advance_mode(&self) -> AdvanceMode {
        self.advance_mode
    }

    pub fn preset_id(&self) -> Option<&str> {
        self.preset_id.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn with_cycles_unchecked(mut self, cycles: u32) -> Self {
        self.cycles_before_long_break = cycles;
        self
    }

    pub fn duration_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_duration_seconds,
            Phase::ShortBreak => self.short_break_duration_seconds,
            Phase::LongBreak => self.long_break_duration_seconds,
        }
    }
}

impl Default for TimerConfiguration {
    fn default() -> Self {
        Self::standard()
    }
}
