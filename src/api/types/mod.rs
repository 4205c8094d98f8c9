//! Request/response types shared by the HTTP handlers

pub mod error;
pub mod json;
pub mod users;

pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use users::{UserListResponse, UserPayload, UserResponse};
