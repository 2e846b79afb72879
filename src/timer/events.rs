use serde::{Deserialize, Serialize};

use crate::session::SessionRecord;

use super::{Phase, RunState};

/// Lifecycle events emitted by the engine, in the order they happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    Started {
        phase: Phase,
        cycle_index: u32,
        duration_seconds: u32,
    },
    Paused {
        remaining_seconds: u32,
    },
    Resumed {
        remaining_seconds: u32,
    },
    /// A phase ran down to zero.
    PhaseCompleted {
        record: SessionRecord,
        next_phase: Phase,
    },
    /// A phase was cut short by `stop()` or `skip()`.
    PhaseAborted {
        record: SessionRecord,
    },
    /// A new phase began counting down without owner interaction.
    PhaseStarted {
        phase: Phase,
        cycle_index: u32,
        duration_seconds: u32,
        run_state: RunState,
    },
    /// Manual-advance mode: the next phase is waiting for `advance()`.
    PhaseReady {
        phase: Phase,
        cycle_index: u32,
        duration_seconds: u32,
    },
}

impl TimerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Started { .. } => "started",
            TimerEvent::Paused { .. } => "paused",
            TimerEvent::Resumed { .. } => "resumed",
            TimerEvent::PhaseCompleted { .. } => "phase-completed",
            TimerEvent::PhaseAborted { .. } => "phase-aborted",
            TimerEvent::PhaseStarted { .. } => "phase-started",
            TimerEvent::PhaseReady { .. } => "phase-ready",
        }
    }

    /// The record to hand to the session logger, if this event closes a phase.
    pub fn session_record(&self) -> Option<&SessionRecord> {
        match self {
            TimerEvent::PhaseCompleted { record, .. } | TimerEvent::PhaseAborted { record } => {
                Some(record)
            }
            _ => None,
        }
    }
}
