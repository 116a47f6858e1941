//! The exercise session controller and its state machine.

mod controller;
mod state;

pub use controller::ExerciseSession;
pub use state::{ExercisePhase, ExerciseState, RunOutcome};
