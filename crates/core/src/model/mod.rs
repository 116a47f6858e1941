mod alert;
mod execution;
mod ids;
mod lesson;
mod progress;
mod user;

pub use alert::{ALERT_TTL_SECS, AlertMessage, AlertSeverity};
pub use execution::{ExecutionResult, ExecutionStatus};
pub use ids::{LessonId, UserId};
pub use lesson::{AnnotatedEntry, CatalogEntry, EXERCISE_PLACEHOLDER, Lesson, LessonError};
pub use progress::{CompletionRecord, CompletionStatus, ProgressError};
pub use user::{Credential, CredentialError, User};
