//! HTTP implementation of the remote gateways.
//!
//! Speaks the lesson platform's JSON API: catalog and lesson bodies are
//! public, progress/execution/identity calls carry the bearer credential in
//! the `Authorization` header. Non-success responses carry an optional
//! `{"detail": ...}` body whose message is surfaced to the caller.

mod auth;
mod catalog;
mod execution;
mod progress;

use std::env;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::gateway::{Backend, RemoteError};

/// Connection settings for the HTTP backend.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub base_url: String,
}

impl HttpConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Reads `LESSONS_API_URL`, defaulting to a local development server.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("LESSONS_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());
        Self { base_url }
    }
}

/// Remote gateway implementation backed by the platform's HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Wraps this backend in the trait-object aggregate.
    #[must_use]
    pub fn into_backend(self) -> Backend {
        let catalog: std::sync::Arc<dyn crate::gateway::CatalogGateway> =
            std::sync::Arc::new(self.clone());
        let progress: std::sync::Arc<dyn crate::gateway::ProgressGateway> =
            std::sync::Arc::new(self.clone());
        let execution: std::sync::Arc<dyn crate::gateway::ExecutionGateway> =
            std::sync::Arc::new(self.clone());
        let auth: std::sync::Arc<dyn crate::gateway::AuthGateway> = std::sync::Arc::new(self);
        Backend {
            catalog,
            progress,
            execution,
            auth,
        }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct DetailBody {
    detail: Option<String>,
}

/// Maps a non-success response to a `RemoteError`, extracting the server's
/// `detail` message when the body carries one.
pub(crate) async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        _ => {
            let detail = response
                .json::<DetailBody>()
                .await
                .ok()
                .and_then(|body| body.detail);
            RemoteError::Status {
                status: status.as_u16(),
                detail,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let backend = HttpBackend::new(&HttpConfig::new("http://localhost:8000/"));
        assert_eq!(backend.url("/lessons/"), "http://localhost:8000/lessons/");
    }
}
