use async_trait::async_trait;
use serde::Deserialize;

use lesson_core::model::{CatalogEntry, Lesson, LessonId};

use super::{HttpBackend, error_from_response};
use crate::gateway::{CatalogGateway, RemoteError};

#[derive(Debug, Deserialize)]
struct LessonBody {
    id: LessonId,
    title: String,
    content: String,
    code_example: Option<String>,
    prefill_code: Option<String>,
    test_code: Option<String>,
}

impl LessonBody {
    fn into_lesson(self) -> Result<Lesson, RemoteError> {
        Lesson::new(
            self.id,
            self.title,
            self.content,
            self.code_example,
            self.prefill_code,
            self.test_code,
        )
        .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogGateway for HttpBackend {
    async fn list_lessons(&self) -> Result<Vec<CatalogEntry>, RemoteError> {
        let response = self.client().get(self.url("/lessons/")).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<Vec<CatalogEntry>>().await?)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, RemoteError> {
        let response = self
            .client()
            .get(self.url(&format!("/lessons/{id}")))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json::<LessonBody>().await?.into_lesson()
    }
}
