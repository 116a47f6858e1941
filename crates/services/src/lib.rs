#![forbid(unsafe_code)]

pub mod access;
pub mod app_services;
pub mod catalog;
pub mod credentials;
pub mod error;
pub mod exercise;
pub mod progress;
pub mod session_store;

pub use lesson_core::Clock;

pub use access::AccessPolicy;
pub use app_services::AppServices;
pub use catalog::{CatalogService, Neighbors};
pub use credentials::{
    CredentialStore, CredentialStoreError, FileCredentialStore, InMemoryCredentialStore,
};
pub use error::{AuthError, CatalogError, ExerciseError, ProgressSyncError};
pub use exercise::{ExercisePhase, ExerciseSession, ExerciseState, RunOutcome};
pub use progress::ProgressSync;
pub use session_store::SessionStore;
