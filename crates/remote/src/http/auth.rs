use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use lesson_core::model::{Credential, User};

use super::{HttpBackend, error_from_response};
use crate::gateway::{AuthGateway, RemoteError};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[async_trait]
impl AuthGateway for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, RemoteError> {
        // OAuth2 password flow: the server expects form fields, not JSON.
        let form = [("username", email), ("password", password)];
        let response = self
            .client()
            .post(self.url("/token"))
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: TokenResponse = response.json().await?;
        Credential::new(body.access_token, body.token_type)
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn current_user(&self, credential: &Credential) -> Result<User, RemoteError> {
        let response = self
            .client()
            .get(self.url("/users/me/"))
            .header(AUTHORIZATION, credential.authorization_value())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<User>().await?)
    }
}
