//! `/users` endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, UserListResponse, UserPayload, UserResponse};
use crate::domain::{User, UserId};
use crate::infrastructure::user::{RegisterUserRequest, UpdateUserRequest};

pub fn create_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(register_user))
        .route("/{id}", get(get_user).put(update_user))
}

/// Optional exact-match filters for `GET /users`
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub username: Option<String>,
    pub email: Option<String>,
}

fn parse_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse::<UserId>().map_err(|e| {
        ApiError::bad_request(format!("Invalid user ID: {}", e))
            .with_param("id")
            .with_code("invalid_id")
    })
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let request = RegisterUserRequest {
        username: payload.username,
        email: payload.email,
    };

    let user = state
        .user_service
        .register(request)
        .await
        .map_err(|e| ApiError::from_write(e, state.error_mode))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let user = state.user_service.get(id).await?;

    Ok(Json(UserResponse::from(&user)))
}

async fn update_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let request = UpdateUserRequest {
        username: payload.username,
        email: payload.email,
    };

    let user = state
        .user_service
        .update(id, request)
        .await
        .map_err(|e| ApiError::from_write(e, state.error_mode))?;

    Ok(Json(UserResponse::from(&user)))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users: Vec<User> = match (query.username, query.email) {
        (None, None) => state.user_service.list().await?,
        (username, email) => {
            debug!(?username, ?email, "Filtering users");

            let by_username = match &username {
                Some(u) => state.user_service.find_by_username(u).await?,
                None => None,
            };
            let by_email = match &email {
                Some(e) => state.user_service.find_by_email(e).await?,
                None => None,
            };

            // Both filters given: keep the user only when they agree.
            match (username.is_some(), email.is_some()) {
                (true, true) => by_username
                    .filter(|u| by_email.as_ref().is_some_and(|e| e.id() == u.id()))
                    .into_iter()
                    .collect(),
                _ => by_username.or(by_email).into_iter().collect(),
            }
        }
    };

    Ok(Json(UserListResponse::from(users.as_slice())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::ErrorMode;
    use crate::domain::user::MockUserRepository;
    use crate::domain::DomainError;
    use crate::infrastructure::user::{InMemoryUserRepository, UserService};

    fn app(mode: ErrorMode) -> Router {
        let service = UserService::new(Arc::new(InMemoryUserRepository::new()));
        app_with(AppState::new(Arc::new(service), mode))
    }

    fn app_with(state: AppState) -> Router {
        Router::new()
            .nest("/users", create_users_router())
            .with_state(state)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    async fn register(app: &Router, username: &str, email: &str) -> (StatusCode, Value) {
        send(
            app,
            json_request("POST", "/users", json!({"username": username, "email": email})),
        )
        .await
    }

    #[tokio::test]
    async fn test_register_returns_created_user() {
        let app = app(ErrorMode::Detailed);

        let (status, body) = register(&app, "john_doe", "john@example.com").await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["username"], "john_doe");
        assert_eq!(body["display_name"], "john_doe");
        assert_eq!(body["version"], 1);
    }

    #[tokio::test]
    async fn test_register_then_fetch() {
        let app = app(ErrorMode::Detailed);
        register(&app, "john_doe", "john@example.com").await;

        let (status, body) = send(&app, get_request("/users/1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "john@example.com");
    }

    #[tokio::test]
    async fn test_detailed_validation_is_unprocessable() {
        let app = app(ErrorMode::Detailed);

        let (status, body) = register(&app, "jo", "john@example.com").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");
        assert_eq!(body["error"]["code"], "validation");
    }

    #[tokio::test]
    async fn test_detailed_duplicate_is_conflict() {
        let app = app(ErrorMode::Detailed);
        register(&app, "user1", "same@example.com").await;

        let (status, body) = register(&app, "user2", "same@example.com").await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["type"], "conflict_error");
    }

    #[tokio::test]
    async fn test_legacy_register_failures_are_server_errors() {
        let app = app(ErrorMode::Legacy);
        register(&app, "user1", "same@example.com").await;

        let (status, _) = register(&app, "user2", "same@example.com").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, body) = register(&app, "jo", "jo@example.com").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"]["message"],
            "Username is too short. Minimum length is 3 characters"
        );
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_not_found_in_both_modes() {
        for mode in [ErrorMode::Detailed, ErrorMode::Legacy] {
            let app = app(mode);

            let (status, _) = send(&app, get_request("/users/999")).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let app = app(ErrorMode::Detailed);

        for uri in ["/users/abc", "/users/0", "/users/-4"] {
            let (status, body) = send(&app, get_request(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["param"], "id");
        }
    }

    #[tokio::test]
    async fn test_update_user() {
        let app = app(ErrorMode::Detailed);
        register(&app, "old_name", "old@example.com").await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/users/1",
                json!({"username": "new_name", "email": "new@example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "new_name");
        assert_eq!(body["version"], 2);
    }

    #[tokio::test]
    async fn test_update_unknown_user_per_mode() {
        let body = json!({"username": "new_name", "email": "new@example.com"});

        let (status, _) = send(
            &app(ErrorMode::Detailed),
            json_request("PUT", "/users/5", body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app(ErrorMode::Legacy), json_request("PUT", "/users/5", body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_update_malformed_id_in_legacy_mode() {
        let app = app(ErrorMode::Legacy);

        let (status, _) = send(
            &app,
            json_request("PUT", "/users/x1", json!({"username": "abc", "email": "a@b.co"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = app(ErrorMode::Legacy);

        let (status, body) = send(&app, json_request("POST", "/users", json!({"username": 5}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_list_and_filter() {
        let app = app(ErrorMode::Detailed);
        register(&app, "user1", "u1@example.com").await;
        register(&app, "user2", "u2@example.com").await;

        let (status, body) = send(&app, get_request("/users")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);

        let (_, body) = send(&app, get_request("/users?username=user2")).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["users"][0]["email"], "u2@example.com");

        let (_, body) = send(&app, get_request("/users?username=user1&email=u2@example.com")).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_stale_write_is_conflict() {
        let mut repo = MockUserRepository::new();
        repo.expect_get().returning(|id| {
            let now = chrono::Utc::now();
            Ok(Some(User::restore(id, "old_name", "old@example.com", 1, now, now)))
        });
        repo.expect_update()
            .returning(|_| Err(DomainError::stale_write("User '1' was modified concurrently")));

        let service = UserService::new(Arc::new(repo));
        let app = app_with(AppState::new(Arc::new(service), ErrorMode::Detailed));

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/users/1",
                json!({"username": "new_name", "email": "new@example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "stale_write");
    }

    #[tokio::test]
    async fn test_store_failure_on_list_is_server_error() {
        let mut repo = MockUserRepository::new();
        repo.expect_list()
            .returning(|| Err(DomainError::storage("connection refused")));

        let service = UserService::new(Arc::new(repo));
        let app = app_with(AppState::new(Arc::new(service), ErrorMode::Detailed));

        let (status, _) = send(&app, get_request("/users")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
