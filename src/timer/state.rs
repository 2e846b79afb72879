use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Phase, TimerConfiguration};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::Running => "Running",
            RunState::Paused => "Paused",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub configuration: TimerConfiguration,
    pub current_phase: Phase,
    /// Completed work phases in the current long-break super-cycle, from 1.
    pub cycle_index: u32,
    pub remaining_seconds: u32,
    pub run_state: RunState,
    pub phase_started_at: Option<DateTime<Utc>>,
    /// Set when a phase completed in manual-advance mode and the next one has
    /// not been started yet.
    pub awaiting_advance: bool,
}

impl TimerState {
    pub fn new(configuration: TimerConfiguration) -> Self {
        let remaining_seconds = configuration.work_duration_seconds();
        Self {
            configuration,
            current_phase: Phase::Work,
            cycle_index: 1,
            remaining_seconds,
            run_state: RunState::Idle,
            phase_started_at: None,
            awaiting_advance: false,
        }
    }

    pub fn planned_seconds(&self) -> u32 {
        self.configuration.duration_for(self.current_phase)
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.planned_seconds().saturating_sub(self.remaining_seconds)
    }

    pub fn progress_fraction(&self) -> f64 {
        let planned = self.planned_seconds();
        if planned == 0 {
            return 0.0;
        }
        (f64::from(self.elapsed_seconds()) / f64::from(planned)).clamp(0.0, 1.0)
    }

    pub fn begin_session(&mut self, configuration: TimerConfiguration, now: DateTime<Utc>) {
        *self = Self::new(configuration);
        self.run_state = RunState::Running;
        self.phase_started_at = Some(now);
    }

    pub fn enter_phase(&mut self, phase: Phase, cycle_index: u32, duration_seconds: u32) {
        self.current_phase = phase;
        self.cycle_index = cycle_index;
        self.remaining_seconds = duration_seconds;
    }

    /// Back to idle on the current phase with its full duration restored.
    pub fn reset_to_idle(&mut self) {
        self.remaining_seconds = self.planned_seconds();
        self.run_state = RunState::Idle;
        self.phase_started_at = None;
    }
}
