pub mod config;
pub mod controller;
pub mod engine;
pub mod events;
pub mod phase;
pub mod state;

pub use config::{AdvanceMode, TimerConfiguration};
pub use controller::{TimerController, TimerUpdate};
pub use engine::{TimerEngine, TimerSnapshot};
pub use events::TimerEvent;
pub use phase::{next_phase, Phase, PhaseTransition};
pub use state::{RunState, TimerState};
