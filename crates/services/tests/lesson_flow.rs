use std::sync::Arc;

use lesson_core::model::{
    CompletionStatus, ExecutionResult, ExecutionStatus, Lesson, LessonId, User, UserId,
};
use lesson_core::time::fixed_clock;
use remote::{Backend, InMemoryBackend};
use services::credentials::InMemoryCredentialStore;
use services::{AppServices, ExercisePhase, RunOutcome};

fn seeded_backend() -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    backend
        .add_lesson(
            Lesson::new(
                LessonId::new(1),
                "Variables",
                "# Variables\nAssign with `=`.",
                None,
                Some("x = 0".to_owned()),
                Some("assert x == 3".to_owned()),
            )
            .unwrap(),
        )
        .unwrap();
    backend
        .add_lesson(
            Lesson::new(
                LessonId::new(2),
                "Loops",
                "# Loops\nUse `for`.",
                None,
                None,
                None,
            )
            .unwrap(),
        )
        .unwrap();
    backend
        .add_account(
            "hunter2",
            User {
                id: UserId::new(1),
                email: "ada@example.com".to_owned(),
                name: Some("Ada".to_owned()),
                is_admin: false,
            },
        )
        .unwrap();
    backend
}

fn services_over(backend: &InMemoryBackend) -> AppServices {
    AppServices::new(
        Backend::from_in_memory(backend.clone()),
        fixed_clock(),
        Arc::new(InMemoryCredentialStore::new()),
    )
}

#[tokio::test]
async fn lesson_flow_login_run_complete_reset() {
    let backend = seeded_backend();
    let services = services_over(&backend);

    services
        .session()
        .login("ada@example.com", "hunter2")
        .await
        .unwrap();

    // seed the record up front so the background mark-started write cannot
    // land between the run below and the assertions
    services
        .progress()
        .mark_started(UserId::new(1), LessonId::new(1), "x = 0")
        .await
        .unwrap();

    let exercise = services.exercise();
    exercise.enter_lesson(LessonId::new(1)).await.unwrap();
    let state = exercise.state();
    assert_eq!(state.phase, ExercisePhase::Ready);
    assert_eq!(state.code, "x = 0");

    backend
        .push_execution_result(ExecutionResult {
            output: "Tests passed".to_owned(),
            error: None,
            linter_output: None,
            status: ExecutionStatus::Success,
        })
        .unwrap();
    let outcome = exercise.run_code("x = 3").await.unwrap();
    let RunOutcome::Executed(result) = outcome else {
        panic!("expected an executed run");
    };
    assert!(result.passed());
    assert!(exercise.state().is_completed());

    // the completed badge shows up in the catalog listing
    let record = services
        .progress()
        .fetch(LessonId::new(1))
        .await
        .unwrap()
        .unwrap();
    let annotated = services
        .catalog()
        .entries_with_status(std::slice::from_ref(&record))
        .await
        .unwrap();
    assert_eq!(annotated[0].status, CompletionStatus::Completed);
    assert_eq!(annotated[1].status, CompletionStatus::NotStarted);

    exercise.reset_progress().await.unwrap();
    let state = exercise.state();
    assert!(!state.is_completed());
    assert_eq!(state.code, "x = 0");
}

#[tokio::test]
async fn session_restore_spans_service_instances() {
    let backend = seeded_backend();
    let credentials = Arc::new(InMemoryCredentialStore::new());

    let first = AppServices::new(
        Backend::from_in_memory(backend.clone()),
        fixed_clock(),
        credentials.clone(),
    );
    first
        .session()
        .login("ada@example.com", "hunter2")
        .await
        .unwrap();

    // a second launch over the same persisted credential
    let second = AppServices::new(
        Backend::from_in_memory(backend.clone()),
        fixed_clock(),
        credentials,
    );
    second.restore_session().await.unwrap();
    assert!(second.session().is_logged_in());
    assert_eq!(
        second.session().current_user().unwrap().email,
        "ada@example.com"
    );
}
