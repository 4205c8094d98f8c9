//! User infrastructure module
//!
//! Store implementations (in-memory, SQLite, PostgreSQL) for the user
//! registry and the service that coordinates validation with persistence.

mod postgres_repository;
mod repository;
mod service;
mod sqlite_repository;

pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
pub use service::{RegisterUserRequest, UpdateUserRequest, UserService};
pub use sqlite_repository::SqliteUserRepository;
