//! SQLite user repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

const SELECT_COLUMNS: &str = "id, username, email, version, created_at, updated_at";

/// SQLite implementation of UserRepository
///
/// SQLite reports unique violations as `UNIQUE constraint failed: users.<column>`
/// without a constraint name, so conflicts are told apart by column.
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE {} = ?", SELECT_COLUMNS, column);

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user by {}: {}", column, e)))?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO users (username, email, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING {}",
            SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user.username())
            .bind(user.email())
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, user.username(), user.email(), "create"))?;

        row_to_user(&row)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE id = ?", SELECT_COLUMNS);

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
            SET username = ?1, email = ?2, updated_at = ?3, version = version + 1
            WHERE id = ?4 AND version = ?5
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user.username())
            .bind(user.email())
            .bind(user.updated_at())
            .bind(user.id().value())
            .bind(user.version())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, user.username(), user.email(), "update"))?;

        match row {
            Some(row) => row_to_user(&row),
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

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, DomainError> {
    let read = |column: &str, e: sqlx::Error| {
        DomainError::storage(format!("Failed to read {} column: {}", column, e))
    };

    let id: i64 = row.try_get("id").map_err(|e| read("id", e))?;
    let username: String = row.try_get("username").map_err(|e| read("username", e))?;
    let email: String = row.try_get("email").map_err(|e| read("email", e))?;
    let version: i64 = row.try_get("version").map_err(|e| read("version", e))?;
    let created_at: chrono::DateTime<Utc> =
        row.try_get("created_at").map_err(|e| read("created_at", e))?;
    let updated_at: chrono::DateTime<Utc> =
        row.try_get("updated_at").map_err(|e| read("updated_at", e))?;

    let user_id = UserId::new(id)
        .map_err(|e| DomainError::storage(format!("Invalid user ID in database: {}", e)))?;

    Ok(User::restore(user_id, username, email, version, created_at, updated_at))
}

fn map_write_error(err: sqlx::Error, username: &str, email: &str, action: &str) -> DomainError {
    let violation = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.message().to_string());

    match violation {
        Some(message) => conflict_for_message(&message, username, email),
        None => DomainError::storage(format!("Failed to {} user: {}", action, err)),
    }
}

fn conflict_for_message(message: &str, username: &str, email: &str) -> DomainError {
    if message.contains("users.username") {
        DomainError::conflict(format!("Username '{}' already exists", username))
    } else if message.contains("users.email") {
        DomainError::conflict(format!("Email '{}' already exists", email))
    } else {
        DomainError::conflict("User with the same username or email already exists")
    }
}
