//! User domain
//!
//! This module provides the user entity, its validation rules, and the
//! repository trait that persistence adapters implement.

mod entity;
mod repository;
mod validation;

pub use entity::{NewUser, User, UserId, INITIAL_VERSION, UNKNOWN_DISPLAY_NAME};
pub use repository::UserRepository;
pub use validation::{
    is_valid_email, validate_email, validate_user_fields, validate_username, UserValidationError,
    MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH,
};

#[cfg(test)]
pub use repository::MockUserRepository;
