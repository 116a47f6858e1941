use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use lesson_core::model::{
    CatalogEntry, CompletionRecord, Credential, ExecutionResult, ExecutionStatus, Lesson,
    LessonId, User, UserId,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors surfaced by remote gateways.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    /// The server rejected the presented credential.
    #[error("credential rejected by server")]
    Unauthorized,

    /// Non-success response; `detail` carries the server's message if any.
    #[error("request failed with status {status}{}", detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },

    #[error("invalid payload: {0}")]
    Decode(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("connection error: {0}")]
    Connection(String),
}

impl RemoteError {
    /// Human-readable message for alerts: server detail when present,
    /// otherwise the error's own display.
    #[must_use]
    pub fn detail_message(&self) -> String {
        match self {
            RemoteError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }
}

//
// ─── GATEWAYS ──────────────────────────────────────────────────────────────────
//

/// Read access to the ordered lesson catalog and lesson bodies.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch the full ordered lesson list.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport or server failures.
    async fn list_lessons(&self) -> Result<Vec<CatalogEntry>, RemoteError>;

    /// Fetch a single lesson body.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotFound` for an unknown id.
    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, RemoteError>;
}

/// Authenticated access to per-user completion records.
#[async_trait]
pub trait ProgressGateway: Send + Sync {
    /// Fetch the caller's record for a lesson, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unauthorized` for a rejected credential.
    async fn get_completion(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
    ) -> Result<Option<CompletionRecord>, RemoteError>;

    /// Full-replace create-or-update of a record. Idempotent: the same
    /// upsert issued twice leaves the same final state.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on auth, transport, or server failures.
    async fn upsert_completion(
        &self,
        credential: &Credential,
        record: &CompletionRecord,
    ) -> Result<CompletionRecord, RemoteError>;

    /// Delete the caller's record for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on auth, transport, or server failures.
    async fn delete_completion(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
    ) -> Result<(), RemoteError>;

    /// Account-wide reset: delete every record for the caller.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on auth, transport, or server failures.
    async fn delete_all_completions(&self, credential: &Credential) -> Result<(), RemoteError>;
}

/// The sandboxed code-execution service.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Run learner code, with the lesson's test code appended when present.
    ///
    /// A failing run is a normal `ExecutionResult`, not an `Err`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the execution service itself is unreachable
    /// or rejects the request.
    async fn execute(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
        code: &str,
        test_code: Option<&str>,
    ) -> Result<ExecutionResult, RemoteError>;
}

/// Credential issuance and identity lookup.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange email/password for a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unauthorized` for bad credentials.
    async fn login(&self, email: &str, password: &str) -> Result<Credential, RemoteError>;

    /// Resolve the credential to the current user.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unauthorized` for an invalid or expired token.
    async fn current_user(&self, credential: &Credential) -> Result<User, RemoteError>;
}

/// Aggregates the remote gateways behind trait objects for easy swapping.
#[derive(Clone)]
pub struct Backend {
    pub catalog: Arc<dyn CatalogGateway>,
    pub progress: Arc<dyn ProgressGateway>,
    pub execution: Arc<dyn ExecutionGateway>,
    pub auth: Arc<dyn AuthGateway>,
}

impl Backend {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryBackend::new())
    }

    #[must_use]
    pub fn from_in_memory(backend: InMemoryBackend) -> Self {
        let catalog: Arc<dyn CatalogGateway> = Arc::new(backend.clone());
        let progress: Arc<dyn ProgressGateway> = Arc::new(backend.clone());
        let execution: Arc<dyn ExecutionGateway> = Arc::new(backend.clone());
        let auth: Arc<dyn AuthGateway> = Arc::new(backend);
        Self {
            catalog,
            progress,
            execution,
            auth,
        }
    }
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    lessons: Vec<Lesson>,
    completions: HashMap<(UserId, LessonId), CompletionRecord>,
    // email -> (password, user)
    accounts: HashMap<String, (String, User)>,
    // token -> user id
    tokens: HashMap<String, UserId>,
    issued_tokens: u64,
    // queued execution outcomes, oldest first; empty queue echoes the code
    scripted_runs: Vec<ExecutionResult>,
}

/// Simple in-memory backend implementation for testing and prototyping.
///
/// Code execution is scripted: queue outcomes with `push_execution_result`,
/// or get an echoing success result by default.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, RemoteError> {
        self.state
            .lock()
            .map_err(|e| RemoteError::Connection(e.to_string()))
    }

    /// Register a lesson at the end of the catalog order.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Connection` if the state lock is poisoned.
    pub fn add_lesson(&self, lesson: Lesson) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        state.lessons.push(lesson);
        Ok(())
    }

    /// Register an account that `login` will accept.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Connection` if the state lock is poisoned.
    pub fn add_account(&self, password: &str, user: User) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        state
            .accounts
            .insert(user.email.clone(), (password.to_owned(), user));
        Ok(())
    }

    /// Queue the outcome the next `execute` call will return.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Connection` if the state lock is poisoned.
    pub fn push_execution_result(&self, result: ExecutionResult) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        state.scripted_runs.push(result);
        Ok(())
    }

    fn user_for_token(
        state: &InMemoryState,
        credential: &Credential,
    ) -> Result<UserId, RemoteError> {
        state
            .tokens
            .get(credential.token())
            .copied()
            .ok_or(RemoteError::Unauthorized)
    }
}

#[async_trait]
impl CatalogGateway for InMemoryBackend {
    async fn list_lessons(&self) -> Result<Vec<CatalogEntry>, RemoteError> {
        let state = self.lock()?;
        Ok(state
            .lessons
            .iter()
            .map(|lesson| CatalogEntry {
                id: lesson.id(),
                title: lesson.title().to_owned(),
            })
            .collect())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, RemoteError> {
        let state = self.lock()?;
        state
            .lessons
            .iter()
            .find(|lesson| lesson.id() == id)
            .cloned()
            .ok_or(RemoteError::NotFound)
    }
}

#[async_trait]
impl ProgressGateway for InMemoryBackend {
    async fn get_completion(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
    ) -> Result<Option<CompletionRecord>, RemoteError> {
        let state = self.lock()?;
        let user_id = Self::user_for_token(&state, credential)?;
        Ok(state.completions.get(&(user_id, lesson_id)).cloned())
    }

    async fn upsert_completion(
        &self,
        credential: &Credential,
        record: &CompletionRecord,
    ) -> Result<CompletionRecord, RemoteError> {
        let mut state = self.lock()?;
        let user_id = Self::user_for_token(&state, credential)?;
        let mut accepted = record.clone();
        accepted.user_id = user_id;
        state
            .completions
            .insert((user_id, accepted.lesson_id), accepted.clone());
        Ok(accepted)
    }

    async fn delete_completion(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        let user_id = Self::user_for_token(&state, credential)?;
        state.completions.remove(&(user_id, lesson_id));
        Ok(())
    }

    async fn delete_all_completions(&self, credential: &Credential) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        let user_id = Self::user_for_token(&state, credential)?;
        state.completions.retain(|(owner, _), _| *owner != user_id);
        Ok(())
    }
}

#[async_trait]
impl ExecutionGateway for InMemoryBackend {
    async fn execute(
        &self,
        credential: &Credential,
        _lesson_id: LessonId,
        code: &str,
        _test_code: Option<&str>,
    ) -> Result<ExecutionResult, RemoteError> {
        let mut state = self.lock()?;
        Self::user_for_token(&state, credential)?;
        if state.scripted_runs.is_empty() {
            return Ok(ExecutionResult {
                output: code.to_owned(),
                error: None,
                linter_output: None,
                status: ExecutionStatus::Success,
            });
        }
        Ok(state.scripted_runs.remove(0))
    }
}

#[async_trait]
impl AuthGateway for InMemoryBackend {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, RemoteError> {
        let mut state = self.lock()?;
        let user_id = match state.accounts.get(email) {
            Some((expected, user)) if expected == password => user.id,
            _ => return Err(RemoteError::Unauthorized),
        };
        state.issued_tokens += 1;
        let token = format!("token-{}", state.issued_tokens);
        state.tokens.insert(token.clone(), user_id);
        Credential::new(token, "bearer").map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn current_user(&self, credential: &Credential) -> Result<User, RemoteError> {
        let state = self.lock()?;
        let user_id = Self::user_for_token(&state, credential)?;
        state
            .accounts
            .values()
            .find(|(_, user)| user.id == user_id)
            .map(|(_, user)| user.clone())
            .ok_or(RemoteError::Unauthorized)
    }
}
