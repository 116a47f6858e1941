//! View access gating.
//!
//! One capability predicate evaluated before entering a view, instead of
//! conditional checks scattered through the presentation layer.

use crate::error::AuthError;
use crate::session_store::SessionStore;

/// Who may enter a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Public,
    Authenticated,
    Admin,
}

impl AccessPolicy {
    #[must_use]
    pub fn allows(&self, session: &SessionStore) -> bool {
        match self {
            AccessPolicy::Public => true,
            AccessPolicy::Authenticated => session.is_logged_in(),
            AccessPolicy::Admin => session.is_logged_in() && session.is_admin(),
        }
    }

    /// Like `allows`, but says why entry was refused.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthRequired` for a logged-out session and
    /// `AuthError::AdminRequired` for a non-admin one.
    pub fn check(&self, session: &SessionStore) -> Result<(), AuthError> {
        match self {
            AccessPolicy::Public => Ok(()),
            AccessPolicy::Authenticated => {
                if session.is_logged_in() {
                    Ok(())
                } else {
                    Err(AuthError::AuthRequired)
                }
            }
            AccessPolicy::Admin => {
                if !session.is_logged_in() {
                    Err(AuthError::AuthRequired)
                } else if !session.is_admin() {
                    Err(AuthError::AdminRequired)
                } else {
                    Ok(())
                }
            }
        }
    }
}
