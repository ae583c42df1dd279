//! Session domain model.
//!
//! This module contains the authentication session held by the client:
//! the bearer token and the cached profile of the signed-in user.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Closed set of roles the backend assigns.
///
/// Raw role strings are normalized here, at the storage boundary, so nothing
/// deeper in the client compares case-sensitive strings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Role {
    Guest,
    User,
    Doctor,
    Admin,
}

impl Role {
    /// Parses a raw role string, returning `None` for unknown values.
    pub fn from_raw(raw: &str) -> Option<Self> {
        Self::from_str(raw.trim()).ok()
    }
}

/// Deserializes an optional role leniently: unknown or non-string values become `None`.
pub(crate) fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(Role::from_raw))
}

/// Cached identity of the signed-in user.
///
/// Serialized with the backend's `user_info` field names so the stored blob
/// is the same shape the login exchange returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Backend user id
    #[serde(default)]
    pub id: String,
    /// Display name (the backend's `userName`)
    #[serde(rename = "userName", default)]
    pub display_name: String,
    /// Normalized role; `None` when absent or unrecognized
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    /// Account status as reported by the backend (e.g. ACTIVE)
    #[serde(default)]
    pub status: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            status: None,
        }
    }
}

/// The authentication session.
///
/// A missing token means unauthenticated regardless of the cached profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub profile: Option<Profile>,
}

impl Session {
    /// The unauthenticated session.
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    pub fn new(token: impl Into<String>, profile: Option<Profile>) -> Self {
        Self {
            token: Some(token.into()),
            profile,
        }
    }

    /// True when a non-empty token is present.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The bearer token, only when authenticated.
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Role from the cached profile, if any.
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().and_then(|p| p.role)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.display_name.as_str())
    }
}
