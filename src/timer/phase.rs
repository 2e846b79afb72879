use serde::{Deserialize, Serialize};

use super::TimerConfiguration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::ShortBreak => "ShortBreak",
            Phase::LongBreak => "LongBreak",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Focus",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }
}

/// Where the session goes after a phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub phase: Phase,
    pub duration_seconds: u32,
    pub cycle_index: u32,
}

/// Long breaks follow every work phase whose cycle index is a multiple of
/// `cycles_before_long_break`. The cycle index advances when a short break
/// hands back to work and resets to 1 after a long break.
pub fn next_phase(current: Phase, cycle_index: u32, config: &TimerConfiguration) -> PhaseTransition {
    match current {
        Phase::Work => {
            // 0 and 1 both mean "long break after every work phase".
            let interval = config.cycles_before_long_break().max(1);
            let phase = if cycle_index % interval == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            PhaseTransition {
                phase,
                duration_seconds: config.duration_for(phase),
                cycle_index,
            }
        }
        Phase::ShortBreak => PhaseTransition {
            phase: Phase::Work,
            duration_seconds: config.work_duration_seconds(),
            cycle_index: cycle_index.saturating_add(1),
        },
        Phase::LongBreak => PhaseTransition {
            phase: Phase::Work,
            duration_seconds: config.work_duration_seconds(),
            cycle_index: 1,
        },
    }
}
