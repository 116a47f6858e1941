use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use lesson_core::model::{CompletionRecord, Credential, LessonId};

use super::{HttpBackend, error_from_response};
use crate::gateway::{ProgressGateway, RemoteError};

#[async_trait]
impl ProgressGateway for HttpBackend {
    async fn get_completion(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
    ) -> Result<Option<CompletionRecord>, RemoteError> {
        let response = self
            .client()
            .get(self.url(&format!("/lessons/{lesson_id}/progress")))
            .header(AUTHORIZATION, credential.authorization_value())
            .send()
            .await?;
        if !response.status().is_success() {
            // Absent record is a normal answer, not an error.
            return match error_from_response(response).await {
                RemoteError::NotFound => Ok(None),
                err => Err(err),
            };
        }
        Ok(Some(response.json::<CompletionRecord>().await?))
    }

    async fn upsert_completion(
        &self,
        credential: &Credential,
        record: &CompletionRecord,
    ) -> Result<CompletionRecord, RemoteError> {
        let response = self
            .client()
            .put(self.url(&format!("/lessons/{}/progress", record.lesson_id)))
            .header(AUTHORIZATION, credential.authorization_value())
            .json(record)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<CompletionRecord>().await?)
    }

    async fn delete_completion(
        &self,
        credential: &Credential,
        lesson_id: LessonId,
    ) -> Result<(), RemoteError> {
        let response = self
            .client()
            .delete(self.url(&format!("/lessons/{lesson_id}/progress")))
            .header(AUTHORIZATION, credential.authorization_value())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn delete_all_completions(&self, credential: &Credential) -> Result<(), RemoteError> {
        let response = self
            .client()
            .delete(self.url("/progress/"))
            .header(AUTHORIZATION, credential.authorization_value())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}
