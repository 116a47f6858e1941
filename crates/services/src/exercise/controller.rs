use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use lesson_core::model::{
    AlertSeverity, CatalogEntry, CompletionRecord, ExecutionResult, Lesson, LessonId,
};
use remote::{ExecutionGateway, RemoteError};

use super::state::{ExercisePhase, ExerciseState, RunOutcome};
use crate::catalog::{CatalogService, Neighbors};
use crate::error::{AuthError, CatalogError, ExerciseError};
use crate::progress::ProgressSync;
use crate::session_store::SessionStore;

#[derive(Default)]
struct Inner {
    /// Monotone lesson-entry counter. A response captured under an older
    /// epoch is discarded so a slow fetch cannot clobber a newer lesson.
    epoch: u64,
    phase: ExercisePhase,
    lesson: Option<Lesson>,
    code: String,
    record: Option<CompletionRecord>,
    last_result: Option<ExecutionResult>,
    neighbors: Neighbors,
}

/// Per-lesson exercise session controller.
///
/// Owns the code buffer and the last execution result, and sequences the
/// dependent operations around them: run code, interpret the result, and
/// conditionally persist completion. Cloneable; all clones share one state.
#[derive(Clone)]
pub struct ExerciseSession {
    session: SessionStore,
    catalog: CatalogService,
    progress: ProgressSync,
    execution: Arc<dyn ExecutionGateway>,
    inner: Arc<Mutex<Inner>>,
}

impl ExerciseSession {
    #[must_use]
    pub fn new(
        session: SessionStore,
        catalog: CatalogService,
        progress: ProgressSync,
        execution: Arc<dyn ExecutionGateway>,
    ) -> Self {
        Self {
            session,
            catalog,
            progress,
            execution,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, ExerciseError> {
        self.inner.lock().map_err(|_| ExerciseError::Poisoned)
    }

    fn back_to_ready(&self, epoch: u64) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.epoch == epoch {
                inner.phase = ExercisePhase::Ready;
            }
        }
    }

    //
    // ─── LESSON ENTRY ──────────────────────────────────────────────────────
    //

    /// Enter a lesson: fetch its body, its catalog position, and (when
    /// authenticated) the existing completion record, concurrently.
    ///
    /// The transition to `Ready` waits for all three. A lesson-body failure
    /// is fatal for the view; a completion fetch failure is treated as "no
    /// record". If the user has navigated on before the fetches resolve, the
    /// stale responses are discarded without being applied.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::LessonUnavailable` when the lesson body
    /// cannot be fetched.
    pub async fn enter_lesson(&self, id: LessonId) -> Result<(), ExerciseError> {
        let epoch = {
            let mut inner = self.lock()?;
            inner.epoch += 1;
            inner.phase = ExercisePhase::Loading;
            inner.lesson = None;
            inner.record = None;
            inner.last_result = None;
            inner.code.clear();
            inner.neighbors = Neighbors::default();
            inner.epoch
        };
        self.session.set_loading(true);

        let logged_in = self.session.is_logged_in();
        let (lesson_res, neighbors_res, record_res) = tokio::join!(
            self.catalog.lesson(id),
            self.catalog.neighbors(id),
            async {
                if logged_in {
                    self.progress.fetch(id).await
                } else {
                    Ok(None)
                }
            }
        );

        let lesson = match lesson_res {
            Ok(lesson) => lesson,
            Err(err) => {
                if let Ok(mut inner) = self.inner.lock() {
                    if inner.epoch == epoch {
                        inner.phase = ExercisePhase::Idle;
                        self.session.set_loading(false);
                    }
                }
                return Err(match err {
                    CatalogError::Remote(remote) => ExerciseError::LessonUnavailable(remote),
                    CatalogError::Poisoned => ExerciseError::Poisoned,
                });
            }
        };

        let neighbors = neighbors_res.unwrap_or_else(|err| {
            warn!(lesson = %id, error = %err, "catalog position unavailable, navigation disabled");
            Neighbors::default()
        });
        let record = record_res.unwrap_or_else(|err| {
            warn!(lesson = %id, error = %err, "completion record fetch failed, treating as none");
            None
        });

        let record_missing = record.is_none();
        {
            let mut inner = self.lock()?;
            if inner.epoch != epoch {
                debug!(lesson = %id, "discarding stale lesson load");
                return Ok(());
            }
            inner.code = record
                .as_ref()
                .map_or_else(|| lesson.starting_code().to_owned(), |r| {
                    r.last_attempted_code.clone()
                });
            inner.lesson = Some(lesson.clone());
            inner.record = record;
            inner.neighbors = neighbors;
            inner.phase = ExercisePhase::Ready;
        }
        self.session.set_loading(false);

        // Best-effort "mark started" on first view. Never blocks Ready;
        // failure is observable only in the log. Its write races record
        // updates issued right after entry; last write wins.
        if record_missing {
            if let Some(user) = self.session.current_user() {
                let progress = self.progress.clone();
                let starting = lesson.starting_code().to_owned();
                tokio::spawn(async move {
                    if let Err(err) = progress.mark_started(user.id, id, &starting).await {
                        warn!(lesson = %id, error = %err, "failed to mark lesson started");
                    }
                });
            }
        }
        Ok(())
    }

    //
    // ─── RUN & COMPLETE ────────────────────────────────────────────────────
    //

    /// Run the submitted code against the lesson's test code.
    ///
    /// Requires an authenticated session; fails with `AuthRequired` before
    /// any network call otherwise. While a run is already in flight the call
    /// is a no-op (`RunOutcome::AlreadyRunning`). A passing run triggers
    /// exactly one completion upsert assembled from the latest in-memory
    /// notes and bookmark; a failing or erroring run never writes.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` for auth failures, a missing lesson, or an
    /// unreachable execution service. A run that merely fails its tests is
    /// `Ok`: inspect the returned result's status.
    pub async fn run_code(&self, code: &str) -> Result<RunOutcome, ExerciseError> {
        let credential = self
            .session
            .credential()
            .ok_or(AuthError::AuthRequired)
            .map_err(ExerciseError::Auth)?;
        let user = self
            .session
            .current_user()
            .ok_or(AuthError::AuthRequired)
            .map_err(ExerciseError::Auth)?;

        let (epoch, lesson_id, test_code) = {
            let mut inner = self.lock()?;
            let lesson = inner.lesson.as_ref().ok_or(ExerciseError::NoLesson)?;
            if inner.phase.is_busy() {
                return Ok(RunOutcome::AlreadyRunning);
            }
            let lesson_id = lesson.id();
            let test_code = lesson.test_code().map(ToOwned::to_owned);
            inner.phase = ExercisePhase::Running;
            inner.code = code.to_owned();
            (inner.epoch, lesson_id, test_code)
        };

        let result = match self
            .execution
            .execute(&credential, lesson_id, code, test_code.as_deref())
            .await
        {
            Ok(result) => result,
            Err(RemoteError::Unauthorized) => {
                self.back_to_ready(epoch);
                self.session.invalidate();
                return Err(ExerciseError::Auth(AuthError::AuthExpired));
            }
            Err(err) => {
                self.back_to_ready(epoch);
                self.session
                    .raise_alert(err.detail_message(), AlertSeverity::Danger);
                return Err(ExerciseError::Remote(err));
            }
        };

        let completion = {
            let mut inner = self.lock()?;
            if inner.epoch != epoch {
                debug!(lesson = %lesson_id, "discarding execution result for superseded lesson");
                return Ok(RunOutcome::Superseded);
            }
            inner.last_result = Some(result.clone());
            if result.passed() {
                inner.phase = ExercisePhase::Completing;
                // Snapshot assembled at send time from the values held right
                // now, not from when the run started. Narrows the concurrent
                // writer window; the write itself is still last-one-wins
                // against the notes, bookmark, and reset paths and against
                // the background mark-started task from lesson entry.
                let starting = inner
                    .lesson
                    .as_ref()
                    .map_or("", |lesson| lesson.starting_code())
                    .to_owned();
                let mut record = inner
                    .record
                    .clone()
                    .unwrap_or_else(|| CompletionRecord::started(user.id, lesson_id, starting));
                record.mark_completed(code);
                Some(record)
            } else {
                inner.phase = ExercisePhase::Ready;
                None
            }
        };

        if let Some(record) = completion {
            match self.progress.upsert(&record).await {
                Ok(accepted) => {
                    let current = {
                        let mut inner = self.lock()?;
                        if inner.epoch == epoch {
                            inner.record = Some(accepted);
                            inner.phase = ExercisePhase::Ready;
                            true
                        } else {
                            false
                        }
                    };
                    if !current {
                        debug!(lesson = %lesson_id, "discarding completion for superseded lesson");
                        return Ok(RunOutcome::Superseded);
                    }
                    self.session
                        .raise_alert("Lesson completed!", AlertSeverity::Success);
                }
                Err(err) => {
                    // Keep the displayed result: the learner keeps visible
                    // proof their code passed even though persistence failed.
                    warn!(lesson = %lesson_id, error = %err, "completion write failed after passing run");
                    if self.lock()?.epoch != epoch {
                        return Ok(RunOutcome::Superseded);
                    }
                    self.back_to_ready(epoch);
                    self.session.raise_alert(
                        format!("Your code passed, but saving progress failed: {err}"),
                        AlertSeverity::Danger,
                    );
                }
            }
        }

        Ok(RunOutcome::Executed(result))
    }

    //
    // ─── NOTES, BOOKMARK, RESET ────────────────────────────────────────────
    //

    /// Save lesson notes, sending the full current record snapshot with only
    /// the notes changed.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` for auth failures, a missing lesson, or a
    /// failed write.
    pub async fn save_notes(&self, notes: &str) -> Result<(), ExerciseError> {
        let (epoch, record) = self.stage_record_update(|record| record.set_notes(notes))?;
        let accepted = self.progress.upsert(&record).await?;
        self.apply_record(epoch, accepted);
        Ok(())
    }

    /// Flip the bookmark, sending the full current record snapshot with only
    /// the flag changed. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` for auth failures, a missing lesson, or a
    /// failed write.
    pub async fn toggle_bookmark(&self) -> Result<bool, ExerciseError> {
        let (epoch, record) = self.stage_record_update(|record| {
            record.toggle_bookmark();
        })?;
        let accepted = self.progress.upsert(&record).await?;
        let bookmarked = accepted.bookmarked;
        self.apply_record(epoch, accepted);
        Ok(bookmarked)
    }

    /// Reset progress for the current lesson: status back to started, code
    /// buffer back to the prefill, notes and bookmark untouched.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` for auth failures, a missing lesson, or a
    /// failed write.
    pub async fn reset_progress(&self) -> Result<(), ExerciseError> {
        let prefill = {
            let inner = self.lock()?;
            inner
                .lesson
                .as_ref()
                .ok_or(ExerciseError::NoLesson)?
                .starting_code()
                .to_owned()
        };
        let (epoch, record) =
            self.stage_record_update(|record| record.reset_to_started(prefill.clone()))?;
        let accepted = self.progress.upsert(&record).await?;
        {
            let mut inner = self.lock()?;
            if inner.epoch == epoch {
                inner.record = Some(accepted);
                inner.code = prefill;
                inner.last_result = None;
            }
        }
        Ok(())
    }

    /// Clone the current record (or build a fresh `Started` one), apply the
    /// change to it and to the in-memory copy, and hand it back for the
    /// full-replace write.
    fn stage_record_update(
        &self,
        update: impl FnOnce(&mut CompletionRecord),
    ) -> Result<(u64, CompletionRecord), ExerciseError> {
        let user = self
            .session
            .current_user()
            .ok_or(AuthError::AuthRequired)
            .map_err(ExerciseError::Auth)?;
        let mut inner = self.lock()?;
        let lesson = inner.lesson.as_ref().ok_or(ExerciseError::NoLesson)?;
        let lesson_id = lesson.id();
        let starting = lesson.starting_code().to_owned();
        let mut record = inner
            .record
            .clone()
            .unwrap_or_else(|| CompletionRecord::started(user.id, lesson_id, starting));
        update(&mut record);
        inner.record = Some(record.clone());
        Ok((inner.epoch, record))
    }

    fn apply_record(&self, epoch: u64, accepted: CompletionRecord) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.epoch == epoch {
                inner.record = Some(accepted);
            }
        }
    }

    //
    // ─── NAVIGATION & SNAPSHOT ─────────────────────────────────────────────
    //

    /// The catalog entry before the current lesson, if any. Never wraps.
    #[must_use]
    pub fn previous(&self) -> Option<CatalogEntry> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.neighbors.previous.clone())
    }

    /// The catalog entry after the current lesson, if any. Never wraps.
    #[must_use]
    pub fn next(&self) -> Option<CatalogEntry> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.neighbors.next.clone())
    }

    /// Editor binding: replace the code buffer.
    pub fn set_code(&self, code: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.code = code.to_owned();
        }
    }

    /// Snapshot of the controller for presentation.
    #[must_use]
    pub fn state(&self) -> ExerciseState {
        self.inner
            .lock()
            .map(|inner| ExerciseState {
                phase: inner.phase,
                lesson: inner.lesson.clone(),
                code: inner.code.clone(),
                record: inner.record.clone(),
                last_result: inner.last_result.clone(),
                neighbors: inner.neighbors.clone(),
            })
            .unwrap_or_default()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
