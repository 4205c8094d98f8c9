use thiserror::Error;

use super::user::UserValidationError;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Stale write: {message}")]
    StaleWrite { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn stale_write(message: impl Into<String>) -> Self {
        Self::StaleWrite {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Short, stable label for the error kind (used as a metric label)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::Conflict { .. } => "conflict",
            Self::StaleWrite { .. } => "stale_write",
            Self::Internal { .. } => "internal",
            Self::Storage { .. } => "storage",
        }
    }
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("User '42' not found");
        assert_eq!(error.to_string(), "Not found: User '42' not found");
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Invalid input");
        assert_eq!(error.to_string(), "Validation error: Invalid input");
    }

    #[test]
    fn test_conflict_error() {
        let error = DomainError::conflict("Username 'john' already exists");
        assert_eq!(error.to_string(), "Conflict: Username 'john' already exists");
    }

    #[test]
    fn test_from_user_validation_error() {
        let error: DomainError = UserValidationError::EmptyEmail.into();

        assert!(matches!(error, DomainError::Validation { .. }));
        assert_eq!(error.to_string(), "Validation error: Email cannot be empty");
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(DomainError::stale_write("x").kind(), "stale_write");
        assert_eq!(DomainError::storage("x").kind(), "storage");
        assert_eq!(DomainError::not_found("x").kind(), "not_found");
    }
}
