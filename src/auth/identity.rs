//! The identity of a signed-in user, as reported by the identity provider.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A newtype wrapper for the identity provider's opaque user IDs.
///
/// This helps disambiguate user IDs from other strings, leading to better
/// compile time errors when, e.g., an expense title is passed where an owner
/// is expected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The user ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user authenticated by the identity provider.
///
/// This is resolved from the session cookie on every request and is not
/// stored in the database, only its [UserId] is, as the owner of expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The provider's ID for the user.
    pub id: UserId,
    /// The user's first name.
    #[serde(default)]
    pub given_name: String,
    /// The user's last name.
    #[serde(default)]
    pub family_name: String,
    /// The user's email address.
    #[serde(default)]
    pub email: String,
    /// A URL for the user's profile picture.
    #[serde(default)]
    pub picture: Option<String>,
}
