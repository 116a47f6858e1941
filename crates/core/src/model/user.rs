use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CredentialError {
    #[error("credential token cannot be empty")]
    EmptyToken,

    #[error("credential scheme cannot be empty")]
    EmptyScheme,
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// The authenticated user's identity, as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
}

impl User {
    /// Display name, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

//
// ─── CREDENTIAL ────────────────────────────────────────────────────────────────
//

/// Opaque bearer credential issued by the remote auth endpoint.
///
/// One credential is persisted per client instance; it is the only
/// client-side persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    scheme: String,
}

impl Credential {
    /// Creates a credential, rejecting blank token or scheme.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` if either part is blank.
    pub fn new(token: impl Into<String>, scheme: impl Into<String>) -> Result<Self, CredentialError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        let scheme = scheme.into();
        if scheme.trim().is_empty() {
            return Err(CredentialError::EmptyScheme);
        }
        Ok(Self { token, scheme })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Value for the `Authorization` header, e.g. `Bearer <token>`.
    #[must_use]
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.scheme, self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_rejects_blank_parts() {
        assert_eq!(
            Credential::new("  ", "bearer").unwrap_err(),
            CredentialError::EmptyToken
        );
        assert_eq!(
            Credential::new("abc123", "").unwrap_err(),
            CredentialError::EmptyScheme
        );
    }

    #[test]
    fn authorization_value_joins_scheme_and_token() {
        let cred = Credential::new("abc123", "bearer").unwrap();
        assert_eq!(cred.authorization_value(), "bearer abc123");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut user = User {
            id: UserId::new(1),
            email: "ada@example.com".to_owned(),
            name: None,
            is_admin: false,
        };
        assert_eq!(user.display_name(), "ada@example.com");
        user.name = Some("Ada".to_owned());
        assert_eq!(user.display_name(), "Ada");
    }
}
