use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LessonId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown completion status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Per-lesson progress status.
///
/// Transitions are not strictly monotonic: `Completed -> Started` is a valid
/// explicit reset, and absent -> `Started` happens automatically on first
/// authenticated lesson view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    #[default]
    NotStarted,
    Started,
    Completed,
}

impl CompletionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::NotStarted => "not_started",
            CompletionStatus::Started => "started",
            CompletionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            other => Err(ProgressError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── COMPLETION RECORD ─────────────────────────────────────────────────────────
//

/// Persisted per-user, per-lesson progress entry.
///
/// At most one record exists per `(user_id, lesson_id)`; writes are full
/// record replacements, so callers assemble the complete snapshot before
/// sending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub status: CompletionStatus,
    pub last_attempted_code: String,
    pub notes: String,
    pub bookmarked: bool,
}

impl CompletionRecord {
    /// Creates the record written on first lesson view.
    #[must_use]
    pub fn started(user_id: UserId, lesson_id: LessonId, starting_code: impl Into<String>) -> Self {
        Self {
            user_id,
            lesson_id,
            status: CompletionStatus::Started,
            last_attempted_code: starting_code.into(),
            notes: String::new(),
            bookmarked: false,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == CompletionStatus::Completed
    }

    /// Marks the lesson completed, recording the code that passed.
    pub fn mark_completed(&mut self, code: impl Into<String>) {
        self.status = CompletionStatus::Completed;
        self.last_attempted_code = code.into();
    }

    /// Explicit reset: back to `Started` with the prefill code, keeping
    /// notes and bookmark untouched.
    pub fn reset_to_started(&mut self, prefill: impl Into<String>) {
        self.status = CompletionStatus::Started;
        self.last_attempted_code = prefill.into();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Flips the bookmark flag and returns the new value.
    pub fn toggle_bookmark(&mut self) -> bool {
        self.bookmarked = !self.bookmarked;
        self.bookmarked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CompletionRecord {
        CompletionRecord::started(UserId::new(7), LessonId::new(3), "x = 0")
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            CompletionStatus::NotStarted,
            CompletionStatus::Started,
            CompletionStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<CompletionStatus>().unwrap(), status);
        }
        assert!(matches!(
            "done".parse::<CompletionStatus>(),
            Err(ProgressError::UnknownStatus(_))
        ));
    }

    #[test]
    fn completion_and_reset_preserve_notes_and_bookmark() {
        let mut rec = record();
        rec.set_notes("remember the walrus operator");
        rec.toggle_bookmark();

        rec.mark_completed("x = 3");
        assert!(rec.is_completed());
        assert_eq!(rec.last_attempted_code, "x = 3");

        rec.reset_to_started("x = 0");
        assert_eq!(rec.status, CompletionStatus::Started);
        assert_eq!(rec.last_attempted_code, "x = 0");
        assert_eq!(rec.notes, "remember the walrus operator");
        assert!(rec.bookmarked);
    }

    #[test]
    fn toggle_bookmark_is_an_involution() {
        let mut rec = record();
        let original = rec.bookmarked;
        rec.toggle_bookmark();
        rec.toggle_bookmark();
        assert_eq!(rec.bookmarked, original);
    }
}
