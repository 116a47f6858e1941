use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome class of one code run.
///
/// `Failure` means the code ran but did not satisfy the lesson's test code;
/// it is a normal outcome, not a system fault. `Error` covers runs the
/// sandbox could not complete (syntax error, crash, timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
    Error,
}

impl ExecutionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failure => "failure",
            ExecutionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral result of one code run against optional test code.
///
/// Exactly one exists per completed run; the next run supersedes it. It is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub output: String,
    pub error: Option<String>,
    /// Advisory lint findings; never block completion.
    pub linter_output: Option<String>,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    /// True when the run satisfied the lesson's tests.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}
