//! Caller identity and role claims.
//!
//! An [`Identity`] is derived from a verified bearer token and attached to
//! the request context by the auth stage. Once attached it is never mutated
//! for the life of that request. The middleware never persists identities;
//! the identity provider is authoritative.

use serde::{Deserialize, Serialize};

/// The role claim carried by an authenticated caller.
///
/// This is a closed enum rather than a free-form string so that a missing
/// or misspelled claim can never silently grant editorial access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A writer submitting work. The default for any authenticated caller.
    #[default]
    Writer,
    /// An editor working the submissions queue.
    Editor,
    /// A managing editor with full editorial control.
    ManagingEditor,
}

impl Role {
    /// Returns true for roles allowed through the editor gate.
    ///
    /// Managing editors satisfy every check an editor satisfies.
    #[must_use]
    pub const fn is_editorial(self) -> bool {
        matches!(self, Self::Editor | Self::ManagingEditor)
    }

    /// Returns the wire name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Editor => "editor",
            Self::ManagingEditor => "managing_editor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller attached to a request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user identifier from the identity provider.
    pub user_id: String,
    /// The caller's email address.
    pub email: String,
    /// The caller's role claim.
    #[serde(default)]
    pub role: Role,
}

impl Identity {
    /// Creates an identity with the given role.
    #[must_use]
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role,
        }
    }

    /// Creates a writer identity.
    #[must_use]
    pub fn writer(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(user_id, email, Role::Writer)
    }

    /// Creates an editor identity.
    #[must_use]
    pub fn editor(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(user_id, email, Role::Editor)
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes the email or any token material.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("{}:{}", self.role, self.user_id)
    }
}
