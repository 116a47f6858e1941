//! Completion record synchronizer.
//!
//! Performs idempotent full-record upserts of per-lesson progress against the
//! remote store, and fetches the existing record on lesson entry. The server
//! never merges: callers assemble the complete snapshot from their latest
//! in-memory values before calling `upsert`.

use std::sync::Arc;

use lesson_core::model::{CompletionRecord, LessonId, UserId};
use remote::{ProgressGateway, RemoteError};

use crate::error::{AuthError, ProgressSyncError};
use crate::session_store::SessionStore;

/// Cloneable handle to the completion record synchronizer.
#[derive(Clone)]
pub struct ProgressSync {
    session: SessionStore,
    gateway: Arc<dyn ProgressGateway>,
}

impl ProgressSync {
    #[must_use]
    pub fn new(session: SessionStore, gateway: Arc<dyn ProgressGateway>) -> Self {
        Self { session, gateway }
    }

    /// Maps a rejected credential to `AuthExpired`, invalidating the session
    /// on the way through.
    fn map_remote(&self, err: RemoteError) -> ProgressSyncError {
        if matches!(err, RemoteError::Unauthorized) {
            self.session.invalidate();
            ProgressSyncError::Auth(AuthError::AuthExpired)
        } else {
            ProgressSyncError::Remote(err)
        }
    }

    /// Fetch the current record for a lesson, or `None`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthRequired` (no network call) when logged out,
    /// or `ProgressSyncError` for remote failures.
    pub async fn fetch(&self, lesson_id: LessonId) -> Result<Option<CompletionRecord>, ProgressSyncError> {
        let credential = self.session.require_credential()?;
        self.gateway
            .get_completion(&credential, lesson_id)
            .await
            .map_err(|err| self.map_remote(err))
    }

    /// Full-replace upsert of a complete record snapshot. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthRequired` (no network call) when logged out,
    /// or `ProgressSyncError` for remote failures.
    pub async fn upsert(&self, record: &CompletionRecord) -> Result<CompletionRecord, ProgressSyncError> {
        let credential = self.session.require_credential()?;
        self.gateway
            .upsert_completion(&credential, record)
            .await
            .map_err(|err| self.map_remote(err))
    }

    /// Write the initial `Started` record for a lesson's first view.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthRequired` (no network call) when logged out,
    /// or `ProgressSyncError` for remote failures.
    pub async fn mark_started(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        starting_code: &str,
    ) -> Result<CompletionRecord, ProgressSyncError> {
        let record = CompletionRecord::started(user_id, lesson_id, starting_code);
        self.upsert(&record).await
    }

    /// Delete the record for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthRequired` (no network call) when logged out,
    /// or `ProgressSyncError` for remote failures.
    pub async fn delete(&self, lesson_id: LessonId) -> Result<(), ProgressSyncError> {
        let credential = self.session.require_credential()?;
        self.gateway
            .delete_completion(&credential, lesson_id)
            .await
            .map_err(|err| self.map_remote(err))
    }

    /// Account-wide reset: delete every record for the current user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthRequired` (no network call) when logged out,
    /// or `ProgressSyncError` for remote failures.
    pub async fn delete_all(&self) -> Result<(), ProgressSyncError> {
        let credential = self.session.require_credential()?;
        self.gateway
            .delete_all_completions(&credential)
            .await
            .map_err(|err| self.map_remote(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{CompletionStatus, User};
    use lesson_core::time::fixed_clock;
    use remote::InMemoryBackend;

    use crate::credentials::InMemoryCredentialStore;

    async fn world() -> (InMemoryBackend, SessionStore, ProgressSync) {
        let backend = InMemoryBackend::new();
        backend
            .add_account(
                "pw",
                User {
                    id: UserId::new(1),
                    email: "ada@example.com".to_owned(),
                    name: None,
                    is_admin: false,
                },
            )
            .unwrap();
        let session = SessionStore::new(
            fixed_clock(),
            Arc::new(backend.clone()),
            Arc::new(InMemoryCredentialStore::new()),
        );
        session.login("ada@example.com", "pw").await.unwrap();
        let sync = ProgressSync::new(session.clone(), Arc::new(backend.clone()));
        (backend, session, sync)
    }

    #[tokio::test]
    async fn notes_round_trip_through_fetch() {
        let (_backend, _session, sync) = world().await;
        let lesson_id = LessonId::new(4);

        let mut record = CompletionRecord::started(UserId::new(1), lesson_id, "x = 0");
        record.set_notes("walrus operator!");
        sync.upsert(&record).await.unwrap();

        let fetched = sync.fetch(lesson_id).await.unwrap().unwrap();
        assert_eq!(fetched.notes, "walrus operator!");
        assert_eq!(fetched.status, CompletionStatus::Started);
    }

    #[tokio::test]
    async fn double_upsert_equals_single_upsert() {
        let (_backend, _session, sync) = world().await;
        let record = CompletionRecord::started(UserId::new(1), LessonId::new(4), "x = 0");

        let first = sync.upsert(&record).await.unwrap();
        let second = sync.upsert(&record).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(sync.fetch(LessonId::new(4)).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn logged_out_sync_fails_locally() {
        let (_backend, session, sync) = world().await;
        session.logout().unwrap();

        let err = sync.fetch(LessonId::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ProgressSyncError::Auth(AuthError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn server_rejection_invalidates_session() {
        let (_backend, session, _sync) = world().await;
        // a progress store that does not recognize the session's token
        let sync = ProgressSync::new(session.clone(), Arc::new(InMemoryBackend::new()));

        let err = sync.fetch(LessonId::new(1)).await.unwrap_err();
        assert!(matches!(err, ProgressSyncError::Auth(AuthError::AuthExpired)));
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn delete_resets_a_single_lesson() {
        let (_backend, _session, sync) = world().await;
        let record = CompletionRecord::started(UserId::new(1), LessonId::new(4), "x = 0");
        sync.upsert(&record).await.unwrap();

        sync.delete(LessonId::new(4)).await.unwrap();
        assert!(sync.fetch(LessonId::new(4)).await.unwrap().is_none());
    }
}
