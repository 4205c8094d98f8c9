//! User repository trait

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::entity::{NewUser, User, UserId};
use crate::domain::DomainError;

/// Repository trait for user storage
///
/// Implementations are the only place where uniqueness of `username` and
/// `email` is enforced; callers rely on the `Conflict` error rather than
/// checking beforehand.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user and assign its ID
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;

    /// Get a user by ID
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Get a user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Persist the full state of an existing user.
    ///
    /// Fails with `StaleWrite` when the stored version no longer matches
    /// `user.version()`. Returns the user with its new version.
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// List all users, unordered
    async fn list(&self) -> Result<Vec<User>, DomainError>;

    /// Count users
    async fn count(&self) -> Result<usize, DomainError>;
}
