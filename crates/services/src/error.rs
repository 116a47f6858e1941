//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::CredentialError;
use remote::RemoteError;

use crate::credentials::CredentialStoreError;

/// Errors emitted by `SessionStore` and auth-gated actions.
///
/// `AuthRequired` is resolved locally and never causes a network call;
/// `AuthExpired` means the server rejected a credential we held, and the
/// session has already been invalidated when it is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("authentication required")]
    AuthRequired,

    #[error("session expired, please log in again")]
    AuthExpired,

    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("administrator access required")]
    AdminRequired,

    #[error("session state lock poisoned")]
    State,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Store(#[from] CredentialStoreError),

    #[error(transparent)]
    Remote(RemoteError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog cache lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors emitted by `ProgressSync`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressSyncError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Remote(RemoteError),
}

/// Errors emitted by the exercise session controller.
///
/// A failing code run is not an error: it comes back as a normal
/// `ExecutionResult` with a non-success status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExerciseError {
    #[error("no lesson is loaded")]
    NoLesson,

    /// The lesson body itself could not be fetched; fatal for the view.
    #[error("lesson could not be loaded: {0}")]
    LessonUnavailable(RemoteError),

    #[error("exercise state lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Progress(#[from] ProgressSyncError),

    #[error(transparent)]
    Remote(RemoteError),
}
