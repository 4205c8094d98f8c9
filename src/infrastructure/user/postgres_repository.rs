//! PostgreSQL user repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

const SELECT_COLUMNS: &str = "id, username, email, version, created_at, updated_at";

/// PostgreSQL implementation of UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE {} = $1", SELECT_COLUMNS, column);

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user by {}: {}", column, e)))?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let query = format!(
            "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING {}",
            SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user.username())
            .bind(user.email())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, user.username(), user.email(), "create"))?;

        row_to_user(&row)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", SELECT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.fetch_one_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.fetch_one_by("email", email).await
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let query = format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, updated_at = $4, version = version + 1
            WHERE id = $1 AND version = $5
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user.id().value())
            .bind(user.username())
            .bind(user.email())
            .bind(user.updated_at())
            .bind(user.version())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, user.username(), user.email(), "update"))?;

        match row {
            Some(row) => row_to_user(&row),
            // Nothing matched: either the row is gone or its version moved on.
            None => match self.get(user.id()).await? {
                Some(stored) => Err(DomainError::stale_write(format!(
                    "User '{}' was modified concurrently (expected version {}, found {})",
                    user.id(),
                    user.version(),
                    stored.version()
                ))),
                None => Err(DomainError::not_found(format!(
                    "User '{}' not found",
                    user.id()
                ))),
            },
        }
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let query = format!("SELECT {} FROM users", SELECT_COLUMNS);

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count users: {}", e)))?;

        Ok(count as usize)
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User, DomainError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| DomainError::storage(format!("Failed to read id column: {}", e)))?;
    let username: String = row
        .try_get("username")
        .map_err(|e| DomainError::storage(format!("Failed to read username column: {}", e)))?;
    let email: String = row
        .try_get("email")
        .map_err(|e| DomainError::storage(format!("Failed to read email column: {}", e)))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| DomainError::storage(format!("Failed to read version column: {}", e)))?;
    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(|e| DomainError::storage(format!("Failed to read created_at column: {}", e)))?;
    let updated_at: chrono::DateTime<chrono::Utc> = row
        .try_get("updated_at")
        .map_err(|e| DomainError::storage(format!("Failed to read updated_at column: {}", e)))?;

    let user_id = UserId::new(id)
        .map_err(|e| DomainError::storage(format!("Invalid user ID in database: {}", e)))?;

    Ok(User::restore(user_id, username, email, version, created_at, updated_at))
}

fn map_write_error(err: sqlx::Error, username: &str, email: &str, action: &str) -> DomainError {
    let constraint = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.constraint().unwrap_or_default().to_string());

    match constraint {
        Some(name) => conflict_for_constraint(&name, username, email),
        None => DomainError::storage(format!("Failed to {} user: {}", action, err)),
    }
}

fn conflict_for_constraint(constraint: &str, username: &str, email: &str) -> DomainError {
    match constraint {
        USERNAME_CONSTRAINT => {
            DomainError::conflict(format!("Username '{}' already exists", username))
        }
        EMAIL_CONSTRAINT => DomainError::conflict(format!("Email '{}' already exists", email)),
        _ => DomainError::conflict("User with the same username or email already exists"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_for_username_constraint() {
        let err = conflict_for_constraint(USERNAME_CONSTRAINT, "john_doe", "john@example.com");
        assert_eq!(err.to_string(), "Conflict: Username 'john_doe' already exists");
    }

    #[test]
    fn test_conflict_for_email_constraint() {
        let err = conflict_for_constraint(EMAIL_CONSTRAINT, "john_doe", "john@example.com");
        assert_eq!(err.to_string(), "Conflict: Email 'john@example.com' already exists");
    }

    #[test]
    fn test_conflict_for_unknown_constraint() {
        let err = conflict_for_constraint("", "john_doe", "john@example.com");
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn test_non_database_error_maps_to_storage() {
        let err = map_write_error(sqlx::Error::PoolTimedOut, "john_doe", "john@example.com", "create");
        assert!(matches!(err, DomainError::Storage { .. }));
        assert!(err.to_string().contains("Failed to create user"));
    }
}
