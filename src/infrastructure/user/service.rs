//! User service: registration and read-modify-write updates

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

/// Request for registering a new user
#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
}

/// Request for replacing a user's username and email
#[derive(Debug, Clone)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
}

/// User service coordinating validation and persistence
///
/// Holds no state between calls. No lock is taken across the fetch and the
/// write of an update; lost updates surface as `StaleWrite` from the store.
#[derive(Debug)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    /// Create a new user service
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Validate and persist a new user
    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, DomainError> {
        let result = self.try_register(request).await;
        record_outcome(Operation::Register, &result);
        result
    }

    async fn try_register(&self, request: RegisterUserRequest) -> Result<User, DomainError> {
        let new_user = NewUser::new(&request.username, &request.email)?;

        debug!(username = %new_user.username(), "Registering user");

        let user = self.repository.create(new_user).await?;

        info!(user_id = %user.id(), username = %user.username(), "User registered");

        Ok(user)
    }

    /// Get a user by ID
    pub async fn get(&self, id: UserId) -> Result<User, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))
    }

    /// Get a user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.repository.get_by_username(username.trim()).await
    }

    /// Get a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.repository.get_by_email(email.trim()).await
    }

    /// List all users
    pub async fn list(&self) -> Result<Vec<User>, DomainError> {
        self.repository.list().await
    }

    /// Count users
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }

    /// Replace username and email of an existing user.
    ///
    /// The candidate values go through the same validation as registration;
    /// the store is not touched when they are invalid.
    pub async fn update(
        &self,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<User, DomainError> {
        let result = self.try_update(id, request).await;
        record_outcome(Operation::Update, &result);
        result
    }

    async fn try_update(&self, id: UserId, request: UpdateUserRequest) -> Result<User, DomainError> {
        let mut user = self.get(id).await?;

        user.apply_update(&request.username, &request.email)?;

        debug!(user_id = %id, version = user.version(), "Persisting user update");

        let updated = self.repository.update(&user).await?;

        info!(user_id = %id, version = updated.version(), "User updated");

        Ok(updated)
    }
}

/// Write operations whose outcomes are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Register,
    Update,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Update => "update",
        }
    }

    fn success_counter(self) -> &'static str {
        match self {
            Self::Register => "users_registered_total",
            Self::Update => "users_updated_total",
        }
    }
}

fn record_outcome(operation: Operation, result: &Result<User, DomainError>) {
    match result {
        Ok(_) => counter!(operation.success_counter()).increment(1),
        Err(e) => {
            let operation = operation.as_str();
            warn!(operation, kind = e.kind(), error = %e, "User operation failed");
            counter!(
                "user_operation_failures_total",
                "operation" => operation,
                "kind" => e.kind()
            )
            .increment(1);
        }
    }
}
