use lesson_core::model::{CompletionRecord, ExecutionResult, Lesson};

use crate::catalog::Neighbors;

/// Where the controller is in its per-lesson lifecycle.
///
/// The success loop is `Idle -> Loading -> Ready -> Running -> Completing ->
/// Ready`; a failed run goes straight back to `Ready` with the result (and
/// any error text) surfaced on the state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExercisePhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Running,
    Completing,
}

impl ExercisePhase {
    /// True while a run or its completion write is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, ExercisePhase::Running | ExercisePhase::Completing)
    }
}

/// What happened to a `run_code` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The code ran; inspect the result's status for pass/fail.
    Executed(ExecutionResult),
    /// A run was already in flight; no second execution request was issued.
    AlreadyRunning,
    /// The user navigated away mid-run; the response was discarded.
    Superseded,
}

/// Immutable snapshot of the controller for presentation.
#[derive(Debug, Clone, Default)]
pub struct ExerciseState {
    pub phase: ExercisePhase,
    pub lesson: Option<Lesson>,
    /// The editor buffer.
    pub code: String,
    pub record: Option<CompletionRecord>,
    pub last_result: Option<ExecutionResult>,
    pub neighbors: Neighbors,
}

impl ExerciseState {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.record
            .as_ref()
            .is_some_and(CompletionRecord::is_completed)
    }

    #[must_use]
    pub fn is_bookmarked(&self) -> bool {
        self.record.as_ref().is_some_and(|record| record.bookmarked)
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        self.record
            .as_ref()
            .map_or("", |record| record.notes.as_str())
    }
}
