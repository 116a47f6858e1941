use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;

use lesson_core::model::{Credential, ExecutionResult, LessonId};

use super::{HttpBackend, error_from_response};
use crate::gateway::{ExecutionGateway, RemoteError};

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
    language: &'static str,
    test_code: Option<&'a str>,
    lesson_id: LessonId,
}

#[async_trait]
impl ExecutionGateway for HttpBackend {
    async fn execute(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
        code: &str,
        test_code: Option<&str>,
    ) -> Result<ExecutionResult, RemoteError> {
        let payload = ExecuteRequest {
            code,
            language: "python",
            test_code,
            lesson_id,
        };
        let response = self
            .client()
            .post(self.url("/execute-code/"))
            .header(AUTHORIZATION, credential.authorization_value())
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<ExecutionResult>().await?)
    }
}
