use std::path::PathBuf;
use std::sync::Arc;

use lesson_core::Clock;
use remote::{Backend, HttpBackend, HttpConfig};

use crate::catalog::CatalogService;
use crate::credentials::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};
use crate::error::AuthError;
use crate::exercise::ExerciseSession;
use crate::progress::ProgressSync;
use crate::session_store::SessionStore;

/// Assembles the client-facing services over one backend.
///
/// All handles are cheap clones sharing state; build once at startup and
/// hand pieces to whichever surface needs them.
#[derive(Clone)]
pub struct AppServices {
    session: SessionStore,
    catalog: CatalogService,
    progress: ProgressSync,
    exercise: ExerciseSession,
}

impl AppServices {
    #[must_use]
    pub fn new(backend: Backend, clock: Clock, credentials: Arc<dyn CredentialStore>) -> Self {
        let session = SessionStore::new(clock, Arc::clone(&backend.auth), credentials);
        let catalog = CatalogService::new(Arc::clone(&backend.catalog));
        let progress = ProgressSync::new(session.clone(), Arc::clone(&backend.progress));
        let exercise = ExerciseSession::new(
            session.clone(),
            catalog.clone(),
            progress.clone(),
            Arc::clone(&backend.execution),
        );
        Self {
            session,
            catalog,
            progress,
            exercise,
        }
    }

    /// Build services against the HTTP backend, persisting the credential to
    /// `credential_path`.
    #[must_use]
    pub fn new_http(config: HttpConfig, clock: Clock, credential_path: PathBuf) -> Self {
        let backend = HttpBackend::new(&config).into_backend();
        let store = Arc::new(FileCredentialStore::new(credential_path));
        Self::new(backend, clock, store)
    }

    /// Build services against the in-memory backend with no credential
    /// persistence. Used in tests and prototypes.
    #[must_use]
    pub fn new_in_memory(clock: Clock) -> Self {
        Self::new(
            Backend::in_memory(),
            clock,
            Arc::new(InMemoryCredentialStore::new()),
        )
    }

    /// Restore a persisted credential, if any, validating it against the
    /// server. A rejected credential is cleared silently.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` when the credential store itself fails.
    pub async fn restore_session(&self) -> Result<(), AuthError> {
        self.session.restore().await
    }

    #[must_use]
    pub fn session(&self) -> SessionStore {
        self.session.clone()
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService {
        self.catalog.clone()
    }

    #[must_use]
    pub fn progress(&self) -> ProgressSync {
        self.progress.clone()
    }

    #[must_use]
    pub fn exercise(&self) -> ExerciseSession {
        self.exercise.clone()
    }
}
