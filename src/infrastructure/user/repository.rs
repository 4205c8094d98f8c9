//! In-memory user repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct UserTable {
    users: HashMap<UserId, User>,
    /// username -> user ID
    username_index: HashMap<String, UserId>,
    /// email -> user ID
    email_index: HashMap<String, UserId>,
    last_id: i64,
}

impl UserTable {
    fn next_id(&mut self) -> Result<UserId, DomainError> {
        self.last_id += 1;
        UserId::new(self.last_id).map_err(|e| DomainError::internal(e.to_string()))
    }

    fn insert(&mut self, user: User) {
        self.username_index.insert(user.username().to_string(), user.id());
        self.email_index.insert(user.email().to_string(), user.id());
        self.last_id = self.last_id.max(user.id().value());
        self.users.insert(user.id(), user);
    }

    fn claimed_by_other(index: &HashMap<String, UserId>, key: &str, id: UserId) -> bool {
        index.get(key).is_some_and(|owner| *owner != id)
    }
}

/// In-memory implementation of UserRepository
///
/// All mutations happen under one write lock, so uniqueness and version
/// checks are atomic with the write they guard.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<UserTable>>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with initial users
    pub fn with_users(users: Vec<User>) -> Self {
        let mut table = UserTable::default();

        for user in users {
            table.insert(user);
        }

        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut table = self.table.write().await;

        if table.username_index.contains_key(user.username()) {
            return Err(DomainError::conflict(format!(
                "Username '{}' already exists",
                user.username()
            )));
        }

        if table.email_index.contains_key(user.email()) {
            return Err(DomainError::conflict(format!(
                "Email '{}' already exists",
                user.email()
            )));
        }

        let id = table.next_id()?;
        let user = user.assign(id, Utc::now());
        table.insert(user.clone());

        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let table = self.table.read().await;
        Ok(table.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let table = self.table.read().await;

        Ok(table
            .username_index
            .get(username)
            .and_then(|id| table.users.get(id))
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let table = self.table.read().await;

        Ok(table
            .email_index
            .get(email)
            .and_then(|id| table.users.get(id))
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut table = self.table.write().await;
        let id = user.id();

        let stored = table
            .users
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))?;

        if stored.version() != user.version() {
            return Err(DomainError::stale_write(format!(
                "User '{}' was modified concurrently (expected version {}, found {})",
                id,
                user.version(),
                stored.version()
            )));
        }

        let old_username = stored.username().to_string();
        let old_email = stored.email().to_string();

        if UserTable::claimed_by_other(&table.username_index, user.username(), id) {
            return Err(DomainError::conflict(format!(
                "Username '{}' already exists",
                user.username()
            )));
        }

        if UserTable::claimed_by_other(&table.email_index, user.email(), id) {
            return Err(DomainError::conflict(format!(
                "Email '{}' already exists",
                user.email()
            )));
        }

        table.username_index.remove(&old_username);
        table.email_index.remove(&old_email);

        let updated = User::restore(
            id,
            user.username(),
            user.email(),
            user.version() + 1,
            user.created_at(),
            user.updated_at(),
        );
        table.insert(updated.clone());

        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let table = self.table.read().await;
        Ok(table.users.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let table = self.table.read().await;
        Ok(table.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser::new(username, email).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryUserRepository::new();

        let created = repo.create(new_user("john_doe", "john@example.com")).await.unwrap();
        assert_eq!(created.id().value(), 1);
        assert_eq!(created.version(), 1);

        let retrieved = repo.get(created.id()).await.unwrap();
        assert_eq!(retrieved, Some(created));
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let repo = InMemoryUserRepository::new();

        let first = repo.create(new_user("user1", "user1@example.com")).await.unwrap();
        let second = repo.create(new_user("user2", "user2@example.com")).await.unwrap();

        assert_eq!(first.id().value(), 1);
        assert_eq!(second.id().value(), 2);
    }

    #[tokio::test]
    async fn test_get_by_username_and_email() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(new_user("john_doe", "john@example.com")).await.unwrap();

        let by_username = repo.get_by_username("john_doe").await.unwrap();
        assert_eq!(by_username.map(|u| u.id()), Some(created.id()));

        let by_email = repo.get_by_email("john@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id()), Some(created.id()));

        assert!(repo.get_by_username("nonexistent").await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("sameusername", "a@example.com")).await.unwrap();

        let result = repo.create(new_user("sameusername", "b@example.com")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("user1", "same@example.com")).await.unwrap();

        let result = repo.create(new_user("user2", "same@example.com")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_moves_indexes_and_bumps_version() {
        let repo = InMemoryUserRepository::new();
        let mut user = repo.create(new_user("testuser", "test@example.com")).await.unwrap();

        user.apply_update("newusername", "new@example.com").unwrap();
        let updated = repo.update(&user).await.unwrap();
        assert_eq!(updated.version(), 2);

        let retrieved = repo.get(user.id()).await.unwrap().unwrap();
        assert_eq!(retrieved.username(), "newusername");
        assert_eq!(retrieved.version(), 2);

        assert!(repo.get_by_username("testuser").await.unwrap().is_none());
        assert!(repo.get_by_email("test@example.com").await.unwrap().is_none());
        assert!(repo.get_by_username("newusername").await.unwrap().is_some());
        assert!(repo.get_by_email("new@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_with_same_values() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(new_user("new", "new@example.com")).await.unwrap();

        let updated = repo.update(&user).await.unwrap();
        assert_eq!(updated.username(), "new");
        assert_eq!(updated.email(), "new@example.com");
    }

    #[tokio::test]
    async fn test_update_conflict_leaves_record_unchanged() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("user1", "user1@example.com")).await.unwrap();
        let mut user2 = repo.create(new_user("user2", "user2@example.com")).await.unwrap();

        user2.apply_update("user1", "user2@example.com").unwrap();
        let result = repo.update(&user2).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));

        let stored = repo.get(user2.id()).await.unwrap().unwrap();
        assert_eq!(stored.username(), "user2");
        assert_eq!(stored.version(), 1);
        assert!(repo.get_by_username("user2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("user1", "user1@example.com")).await.unwrap();
        let mut user2 = repo.create(new_user("user2", "user2@example.com")).await.unwrap();

        user2.apply_update("user2", "user1@example.com").unwrap();
        let result = repo.update(&user2).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        let ghost = User::restore(UserId::new(99).unwrap(), "ghost", "ghost@example.com", 1, now, now);

        let result = repo.update(&ghost).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(new_user("user1", "user1@example.com")).await.unwrap();

        let mut first = created.clone();
        let mut second = created.clone();

        first.apply_update("first", "first@example.com").unwrap();
        repo.update(&first).await.unwrap();

        second.apply_update("second", "second@example.com").unwrap();
        let result = repo.update(&second).await;
        assert!(matches!(result, Err(DomainError::StaleWrite { .. })));

        let stored = repo.get(created.id()).await.unwrap().unwrap();
        assert_eq!(stored.username(), "first");
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let repo = InMemoryUserRepository::new();

        repo.create(new_user("user1", "user1@example.com")).await.unwrap();
        repo.create(new_user("user2", "user2@example.com")).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_with_users_continues_id_sequence() {
        let now = Utc::now();
        let seeded = User::restore(UserId::new(7).unwrap(), "seeded", "seeded@example.com", 1, now, now);
        let repo = InMemoryUserRepository::with_users(vec![seeded]);

        assert!(repo.get_by_username("seeded").await.unwrap().is_some());

        let created = repo.create(new_user("fresh", "fresh@example.com")).await.unwrap();
        assert_eq!(created.id().value(), 8);
    }
}
