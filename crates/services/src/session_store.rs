//! Process-wide session state: the authenticated identity, the persisted
//! credential, and the two transient signals (single-slot alert, loading
//! flag).
//!
//! Modeled as an explicit object handed to every component that needs it,
//! constructed and torn down at the application boundary. Not a hidden
//! singleton.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use tracing::{info, warn};

use lesson_core::Clock;
use lesson_core::model::{AlertMessage, AlertSeverity, Credential, User};
use remote::{AuthGateway, RemoteError};

use crate::credentials::CredentialStore;
use crate::error::AuthError;

struct SessionState {
    clock: Clock,
    credential: Option<Credential>,
    user: Option<User>,
    alert: Option<AlertMessage>,
    loading: bool,
}

/// Cloneable handle to the client's one session.
///
/// Exactly one active session exists per client instance; it is destroyed on
/// logout, credential removal, or server rejection of the credential.
#[derive(Clone)]
pub struct SessionStore {
    auth: Arc<dyn AuthGateway>,
    credentials: Arc<dyn CredentialStore>,
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        clock: Clock,
        auth: Arc<dyn AuthGateway>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            auth,
            credentials,
            inner: Arc::new(Mutex::new(SessionState {
                clock,
                credential: None,
                user: None,
                alert: None,
                loading: false,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, AuthError> {
        self.inner.lock().map_err(|_| AuthError::State)
    }

    //
    // ─── LIFECYCLE ─────────────────────────────────────────────────────────
    //

    /// Initialize from the persisted credential, if present.
    ///
    /// A credential the server rejects is cleared silently; the user simply
    /// starts logged out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` for store failures or non-auth remote failures.
    pub async fn restore(&self) -> Result<(), AuthError> {
        let Some(credential) = self.credentials.load()? else {
            return Ok(());
        };
        match self.auth.current_user(&credential).await {
            Ok(user) => {
                info!(user = %user.email, "session restored from persisted credential");
                let mut state = self.lock()?;
                state.credential = Some(credential);
                state.user = Some(user);
                Ok(())
            }
            Err(RemoteError::Unauthorized) => {
                info!("persisted credential no longer valid, clearing");
                self.credentials.clear()?;
                Ok(())
            }
            Err(err) => Err(AuthError::Remote(err)),
        }
    }

    /// Exchange email/password for a session, persisting the credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when the server rejects the
    /// login, or other `AuthError` variants for store/remote failures.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let credential = match self.auth.login(email, password).await {
            Ok(credential) => credential,
            Err(RemoteError::Unauthorized) => return Err(AuthError::InvalidCredentials),
            Err(err) => return Err(AuthError::Remote(err)),
        };
        let user = match self.auth.current_user(&credential).await {
            Ok(user) => user,
            Err(RemoteError::Unauthorized) => return Err(AuthError::AuthExpired),
            Err(err) => return Err(AuthError::Remote(err)),
        };

        self.credentials.save(&credential)?;
        info!(user = %user.email, "logged in");

        let mut state = self.lock()?;
        state.credential = Some(credential);
        state.user = Some(user.clone());
        Ok(user)
    }

    /// Destroy the session and remove the persisted credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the credential store cannot be cleared.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.credentials.clear()?;
        let mut state = self.lock()?;
        if state.user.is_some() {
            info!("logged out");
        }
        state.credential = None;
        state.user = None;
        Ok(())
    }

    /// Invalidate the session after the server rejected our credential.
    ///
    /// Clears local state and the persisted credential and raises an alert;
    /// listening views are expected to redirect to authentication.
    pub fn invalidate(&self) {
        if let Err(err) = self.credentials.clear() {
            warn!(error = %err, "failed to clear persisted credential");
        }
        if let Ok(mut state) = self.inner.lock() {
            state.credential = None;
            state.user = None;
            let now = state.clock.now();
            state.alert = Some(AlertMessage::new(
                "Your session has expired. Please log in again.",
                AlertSeverity::Warning,
                now,
            ));
        }
        info!("session invalidated by server rejection");
    }

    /// React to an external "credential changed" notification (e.g. another
    /// view logged out or in) by re-validating against the persisted store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` for store failures or non-auth remote failures.
    pub async fn reload_credential(&self) -> Result<(), AuthError> {
        let persisted = self.credentials.load()?;
        let held = {
            let state = self.lock()?;
            state.credential.clone()
        };
        if persisted == held {
            return Ok(());
        }
        match persisted {
            None => {
                info!("credential removed externally, ending session");
                let mut state = self.lock()?;
                state.credential = None;
                state.user = None;
                Ok(())
            }
            Some(credential) => match self.auth.current_user(&credential).await {
                Ok(user) => {
                    let mut state = self.lock()?;
                    state.credential = Some(credential);
                    state.user = Some(user);
                    Ok(())
                }
                Err(RemoteError::Unauthorized) => {
                    self.invalidate();
                    Err(AuthError::AuthExpired)
                }
                Err(err) => Err(AuthError::Remote(err)),
            },
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.inner
            .lock()
            .map(|state| state.credential.is_some())
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner
            .lock()
            .ok()
            .and_then(|state| state.user.as_ref().map(|user| user.is_admin))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.lock().ok().and_then(|state| state.user.clone())
    }

    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.inner
            .lock()
            .ok()
            .and_then(|state| state.credential.clone())
    }

    /// The held credential, or `AuthError::AuthRequired` without any network
    /// call when the session is logged out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthRequired` when no credential is held.
    pub fn require_credential(&self) -> Result<Credential, AuthError> {
        self.lock()?
            .credential
            .clone()
            .ok_or(AuthError::AuthRequired)
    }

    //
    // ─── ALERT & LOADING SIGNALS ───────────────────────────────────────────
    //

    /// Raise an alert, replacing the current one.
    pub fn raise_alert(&self, text: impl Into<String>, severity: AlertSeverity) {
        if let Ok(mut state) = self.inner.lock() {
            let now = state.clock.now();
            state.alert = Some(AlertMessage::new(text, severity, now));
        }
    }

    /// The current alert, pruning it once it has expired.
    #[must_use]
    pub fn current_alert(&self) -> Option<AlertMessage> {
        let mut state = self.inner.lock().ok()?;
        let now = state.clock.now();
        if state.alert.as_ref().is_some_and(|alert| alert.is_expired(now)) {
            state.alert = None;
        }
        state.alert.clone()
    }

    pub fn set_loading(&self, loading: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.loading = loading;
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner
            .lock()
            .map(|state| state.loading)
            .unwrap_or(false)
    }

    /// Advance the session clock. Only affects a fixed clock; used by tests
    /// to exercise alert expiry deterministically.
    pub fn advance_clock(&self, delta: Duration) {
        if let Ok(mut state) = self.inner.lock() {
            state.clock.advance(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::UserId;
    use lesson_core::time::fixed_clock;
    use remote::InMemoryBackend;

    use crate::credentials::InMemoryCredentialStore;

    fn backend_with_account(admin: bool) -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend
            .add_account(
                "hunter2",
                User {
                    id: UserId::new(1),
                    email: "ada@example.com".to_owned(),
                    name: Some("Ada".to_owned()),
                    is_admin: admin,
                },
            )
            .unwrap();
        backend
    }

    fn store_for(backend: &InMemoryBackend) -> (SessionStore, InMemoryCredentialStore) {
        let credentials = InMemoryCredentialStore::new();
        let store = SessionStore::new(
            fixed_clock(),
            Arc::new(backend.clone()),
            Arc::new(credentials.clone()),
        );
        (store, credentials)
    }

    #[tokio::test]
    async fn login_persists_credential_and_identity() {
        let backend = backend_with_account(false);
        let (store, credentials) = store_for(&backend);

        let user = store.login("ada@example.com", "hunter2").await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert!(store.is_logged_in());
        assert!(!store.is_admin());
        assert!(credentials.load().unwrap().is_some());

        store.logout().unwrap();
        assert!(!store.is_logged_in());
        assert!(credentials.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_invalid_credentials() {
        let backend = backend_with_account(false);
        let (store, _credentials) = store_for(&backend);

        let err = store.login("ada@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn restore_picks_up_persisted_credential() {
        let backend = backend_with_account(true);
        let (store, credentials) = store_for(&backend);
        store.login("ada@example.com", "hunter2").await.unwrap();

        // a second store over the same persisted credential
        let fresh = SessionStore::new(
            fixed_clock(),
            Arc::new(backend.clone()),
            Arc::new(credentials.clone()),
        );
        fresh.restore().await.unwrap();
        assert!(fresh.is_logged_in());
        assert!(fresh.is_admin());
    }

    #[tokio::test]
    async fn restore_clears_rejected_credential_silently() {
        let backend = backend_with_account(false);
        let (store, credentials) = store_for(&backend);
        credentials
            .save(&Credential::new("stale-token", "bearer").unwrap())
            .unwrap();

        store.restore().await.unwrap();
        assert!(!store.is_logged_in());
        assert!(credentials.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn reload_credential_reacts_to_external_logout() {
        let backend = backend_with_account(false);
        let (store, credentials) = store_for(&backend);
        store.login("ada@example.com", "hunter2").await.unwrap();

        // another view removed the credential
        credentials.clear().unwrap();
        store.reload_credential().await.unwrap();
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn invalidate_destroys_session_and_warns() {
        let backend = backend_with_account(false);
        let (store, credentials) = store_for(&backend);
        store.login("ada@example.com", "hunter2").await.unwrap();

        store.invalidate();
        assert!(!store.is_logged_in());
        assert!(credentials.load().unwrap().is_none());
        let alert = store.current_alert().unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
    }

    #[tokio::test]
    async fn alert_is_single_slot_and_expires() {
        let backend = backend_with_account(false);
        let (store, _credentials) = store_for(&backend);

        store.raise_alert("first", AlertSeverity::Info);
        store.raise_alert("second", AlertSeverity::Success);
        assert_eq!(store.current_alert().unwrap().text, "second");

        store.advance_clock(Duration::seconds(5));
        assert!(store.current_alert().is_none());
    }

    #[tokio::test]
    async fn require_credential_fails_locally_when_logged_out() {
        let backend = backend_with_account(false);
        let (store, _credentials) = store_for(&backend);
        assert!(matches!(
            store.require_credential().unwrap_err(),
            AuthError::AuthRequired
        ));
    }
}
