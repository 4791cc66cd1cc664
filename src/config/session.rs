//! Current user identity.
//!
//! Authentication itself happens elsewhere; this module only carries the resulting
//! user id. The binary reads it from `STOWAGE_USER_ID`.

use crate::errors::{Error, Result};

/// The signed-in user, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    /// A session for the given user.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// A session with no identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// Reads `STOWAGE_USER_ID`. Unset or blank means anonymous.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("STOWAGE_USER_ID")
            .ok()
            .filter(|id| !id.trim().is_empty())
            .map_or_else(Self::anonymous, Self::signed_in)
    }

    /// The user id, if signed in.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The user id, or [`Error::NotAuthenticated`].
    pub fn require_user(&self) -> Result<&str> {
        self.user_id().ok_or(Error::NotAuthenticated)
    }
}
