use thiserror::Error;

use crate::model::{CredentialError, LessonError, ProgressError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
