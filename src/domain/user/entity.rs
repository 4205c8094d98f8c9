//! User entity and related types

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_user_fields, UserValidationError};

/// Shown when neither a username nor an email is available
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown User";

/// Version assigned to a freshly created user
pub const INITIAL_VERSION: i64 = 1;

/// User identifier - positive integer assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Create a new UserId after validation
    pub fn new(id: i64) -> Result<Self, UserValidationError> {
        if id <= 0 {
            return Err(UserValidationError::InvalidId(id.to_string()));
        }

        Ok(Self(id))
    }

    /// Get the inner integer value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl FromStr for UserId {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .trim()
            .parse::<i64>()
            .map_err(|_| UserValidationError::InvalidId(s.to_string()))?;

        Self::new(id)
    }
}

impl TryFrom<i64> for UserId {
    type Error = UserValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated user that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    username: String,
    email: String,
}

impl NewUser {
    /// Trim and validate the given fields.
    ///
    /// Returns the first failing rule; no value is produced on failure.
    pub fn new(username: &str, email: &str) -> Result<Self, UserValidationError> {
        let username = username.trim();
        let email = email.trim();

        validate_user_fields(username, email)?;

        Ok(Self {
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_user_fields(&self.username, &self.email)
    }

    pub fn display_name(&self) -> &str {
        display_name(&self.username, &self.email)
    }

    /// Turn into a persisted user. Only stores should call this.
    pub fn assign(self, id: UserId, at: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            version: INITIAL_VERSION,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Persisted user entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, never changes
    id: UserId,
    username: String,
    email: String,
    /// Incremented by the store on every successful update
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Rebuild a user from stored state. No validation is applied.
    pub fn restore(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            version,
            created_at,
            updated_at,
        }
    }

    // Getters

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_user_fields(&self.username, &self.email)
    }

    pub fn display_name(&self) -> &str {
        display_name(&self.username, &self.email)
    }

    // Mutators

    /// Replace username and email together.
    ///
    /// Candidates are trimmed and validated before anything is written, so a
    /// failed call leaves the user untouched.
    pub fn apply_update(&mut self, username: &str, email: &str) -> Result<(), UserValidationError> {
        let username = username.trim();
        let email = email.trim();

        validate_user_fields(username, email)?;

        self.username = username.to_string();
        self.email = email.to_string();
        self.touch();

        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn display_name<'a>(username: &'a str, email: &'a str) -> &'a str {
    if !username.is_empty() {
        return username;
    }

    if !email.is_empty() {
        return email.split('@').next().unwrap_or(email);
    }

    UNKNOWN_DISPLAY_NAME
}
