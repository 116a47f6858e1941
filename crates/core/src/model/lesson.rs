use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LessonId;
use crate::model::progress::CompletionStatus;

/// Default exercise text shown when a lesson carries no prefill code.
pub const EXERCISE_PLACEHOLDER: &str = "# Write your solution here";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson content cannot be empty")]
    EmptyContent,
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single lesson as served by the remote catalog.
///
/// Immutable from the exercise controller's perspective; lesson authoring
/// flows mutate it elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    content: String,
    code_example: Option<String>,
    prefill_code: Option<String>,
    test_code: Option<String>,
}

impl Lesson {
    /// Creates a lesson, validating that title and content are non-empty.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the title or markdown body is blank.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        content: impl Into<String>,
        code_example: Option<String>,
        prefill_code: Option<String>,
        test_code: Option<String>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        let content = content.into();
        if content.trim().is_empty() {
            return Err(LessonError::EmptyContent);
        }

        Ok(Self {
            id,
            title,
            content,
            code_example,
            prefill_code,
            test_code,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Markdown body of the lesson.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Optional read-only code sample shown alongside the lesson text.
    #[must_use]
    pub fn code_example(&self) -> Option<&str> {
        self.code_example.as_deref()
    }

    #[must_use]
    pub fn prefill_code(&self) -> Option<&str> {
        self.prefill_code.as_deref()
    }

    /// Optional verification script run against submitted code.
    #[must_use]
    pub fn test_code(&self) -> Option<&str> {
        self.test_code.as_deref()
    }

    /// Text the code buffer starts from when no saved attempt exists.
    #[must_use]
    pub fn starting_code(&self) -> &str {
        self.prefill_code.as_deref().unwrap_or(EXERCISE_PLACEHOLDER)
    }
}

//
// ─── CATALOG ENTRY ─────────────────────────────────────────────────────────────
//

/// Minimal catalog projection of a lesson, used for navigation and badges.
///
/// Ordering is the remote catalog's insertion order, assumed stable for the
/// duration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: LessonId,
    pub title: String,
}

/// A catalog entry annotated with the current user's completion status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedEntry {
    pub entry: CatalogEntry,
    pub status: CompletionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(prefill: Option<&str>) -> Lesson {
        Lesson::new(
            LessonId::new(1),
            "Variables",
            "# Variables\nAssign with `=`.",
            None,
            prefill.map(str::to_owned),
            Some("assert x == 3".to_owned()),
        )
        .unwrap()
    }

    #[test]
    fn rejects_blank_title_and_content() {
        let err = Lesson::new(LessonId::new(1), "  ", "body", None, None, None).unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);

        let err = Lesson::new(LessonId::new(1), "Title", "\n", None, None, None).unwrap_err();
        assert_eq!(err, LessonError::EmptyContent);
    }

    #[test]
    fn starting_code_prefers_prefill() {
        assert_eq!(lesson(Some("x = 0")).starting_code(), "x = 0");
        assert_eq!(lesson(None).starting_code(), EXERCISE_PLACEHOLDER);
    }
}
