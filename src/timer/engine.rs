use serde::Serialize;

use crate::clock::Clock;
use crate::error::TimerError;
use crate::session::SessionRecord;

use super::phase::{next_phase, PhaseTransition};
use super::{AdvanceMode, RunState, TimerConfiguration, TimerEvent, TimerState};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub progress: f64,
}

/// Focus-timer state machine.
///
/// Every operation is synchronous and returns the events it emitted, in order.
/// Failed operations leave the state untouched. The engine never schedules
/// anything itself: the owner calls [`TimerEngine::tick`] once per second
/// while the engine is running.
pub struct TimerEngine<C: Clock> {
    clock: C,
    state: TimerState,
}

impl<C: Clock> TimerEngine<C> {
    pub fn new(clock: C, configuration: TimerConfiguration) -> Self {
        Self {
            clock,
            state: TimerState::new(configuration),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            progress: self.progress_fraction(),
            state: self.state.clone(),
        }
    }

    pub fn progress_fraction(&self) -> f64 {
        self.state.progress_fraction()
    }

    pub fn start(&mut self, configuration: TimerConfiguration) -> Result<Vec<TimerEvent>, TimerError> {
        self.require(&[RunState::Idle], "start")?;

        self.state.begin_session(configuration, self.clock.now());
        Ok(vec![TimerEvent::Started {
            phase: self.state.current_phase,
            cycle_index: self.state.cycle_index,
            duration_seconds: self.state.remaining_seconds,
        }])
    }

    pub fn pause(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        self.require(&[RunState::Running], "pause")?;

        self.state.run_state = RunState::Paused;
        Ok(vec![TimerEvent::Paused {
            remaining_seconds: self.state.remaining_seconds,
        }])
    }

    pub fn resume(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        self.require(&[RunState::Paused], "resume")?;

        self.state.run_state = RunState::Running;
        if self.state.phase_started_at.is_none() {
            // Phase was entered while paused (skip); it starts running now.
            self.state.phase_started_at = Some(self.clock.now());
        }
        Ok(vec![TimerEvent::Resumed {
            remaining_seconds: self.state.remaining_seconds,
        }])
    }

    pub fn stop(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        self.require(&[RunState::Running, RunState::Paused], "stop")?;

        let record = self.close_phase(false);
        self.state.reset_to_idle();
        Ok(vec![TimerEvent::PhaseAborted { record }])
    }

    /// Starts the phase that became ready in manual-advance mode.
    pub fn advance(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        if self.state.run_state != RunState::Idle || !self.state.awaiting_advance {
            return Err(self.invalid("advance"));
        }

        self.state.awaiting_advance = false;
        self.state.run_state = RunState::Running;
        self.state.phase_started_at = Some(self.clock.now());
        Ok(vec![TimerEvent::PhaseStarted {
            phase: self.state.current_phase,
            cycle_index: self.state.cycle_index,
            duration_seconds: self.state.remaining_seconds,
            run_state: RunState::Running,
        }])
    }

    /// Ends the current phase early and moves on as if it had completed.
    pub fn skip(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        self.require(&[RunState::Running, RunState::Paused], "skip")?;

        let previous = self.state.run_state;
        let record = self.close_phase(false);
        let transition = next_phase(self.state.current_phase, self.state.cycle_index, &self.state.configuration);

        let mut events = vec![TimerEvent::PhaseAborted { record }];
        self.enter(transition, previous, &mut events);
        Ok(events)
    }

    /// Advances the countdown by one second. A no-op unless running.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if self.state.run_state != RunState::Running {
            return Vec::new();
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds > 0 {
            return Vec::new();
        }

        let record = self.close_phase(true);
        let transition = next_phase(self.state.current_phase, self.state.cycle_index, &self.state.configuration);

        let mut events = Vec::with_capacity(2);
        events.push(TimerEvent::PhaseCompleted {
            record,
            next_phase: transition.phase,
        });
        self.enter(transition, RunState::Running, &mut events);
        events
    }

    fn enter(&mut self, transition: PhaseTransition, run_state: RunState, events: &mut Vec<TimerEvent>) {
        self.state
            .enter_phase(transition.phase, transition.cycle_index, transition.duration_seconds);

        match self.state.configuration.advance_mode() {
            AdvanceMode::Auto => {
                self.state.run_state = run_state;
                self.state.phase_started_at = match run_state {
                    RunState::Running => Some(self.clock.now()),
                    _ => None,
                };
                events.push(TimerEvent::PhaseStarted {
                    phase: transition.phase,
                    cycle_index: transition.cycle_index,
                    duration_seconds: transition.duration_seconds,
                    run_state,
                });
            }
            AdvanceMode::Manual => {
                self.state.run_state = RunState::Idle;
                self.state.phase_started_at = None;
                self.state.awaiting_advance = true;
                events.push(TimerEvent::PhaseReady {
                    phase: transition.phase,
                    cycle_index: transition.cycle_index,
                    duration_seconds: transition.duration_seconds,
                });
            }
        }
    }

    fn close_phase(&self, completed_normally: bool) -> SessionRecord {
        let now = self.clock.now();
        SessionRecord::new(
            self.state.current_phase,
            self.state.cycle_index,
            self.state.planned_seconds(),
            self.state.elapsed_seconds(),
            self.state.phase_started_at.unwrap_or(now),
            now,
            completed_normally,
            self.state.configuration.preset_id().map(str::to_owned),
        )
    }

    fn require(&self, allowed: &[RunState], operation: &'static str) -> Result<(), TimerError> {
        if allowed.contains(&self.state.run_state) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> TimerError {
        TimerError::InvalidTransition {
            operation,
            state: self.state.run_state,
        }
    }
}
