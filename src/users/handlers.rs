use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest, UserResponse},
        services::{validate_create, validate_update},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, [(header::HeaderName, String); 1], Json<UserResponse>)> {
    let Json(payload) = payload?;
    let new_user =
        validate_create(payload).inspect_err(|e| warn!(error = %e, "invalid create payload"))?;

    let user = state.store.create(new_user).map_err(|e| {
        warn!(error = %e, "create user rejected");
        ApiError::from(e)
    })?;

    info!(user_id = user.id, username = %user.username, "user created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/users/{}", user.id))],
        Json(user.into()),
    ))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<UserResponse>> {
    let users: Vec<UserResponse> = state.store.list_all().into_iter().map(Into::into).collect();
    debug!(count = users.len(), "listed users");
    Json(users)
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<UserResponse>> {
    state
        .store
        .get(id)
        .map(|u| Json(u.into()))
        .ok_or_else(ApiError::user_not_found)
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(payload) = payload?;
    let changes =
        validate_update(payload).inspect_err(|e| warn!(error = %e, "invalid update payload"))?;
    if changes.is_empty() {
        debug!(user_id = id, "update without fields, only updated_at changes");
    }

    match state.store.update(id, changes) {
        Ok(Some(user)) => {
            info!(user_id = id, "user updated");
            Ok(Json(user.into()))
        }
        Ok(None) => Err(ApiError::user_not_found()),
        Err(e) => {
            warn!(error = %e, user_id = id, "update user rejected");
            Err(e.into())
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    if !state.store.delete(id) {
        return Err(ApiError::user_not_found());
    }
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, Response},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(res: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn alice() -> Value {
        json!({"email": "alice@x.com", "username": "alice", "password": "pw12345678"})
    }

    #[tokio::test]
    async fn create_returns_201_without_password_fields() {
        let app = build_app(AppState::fake());
        let res = send(&app, Method::POST, "/api/users/", Some(alice())).await;
        assert_eq!(res.status(), 201);
        assert_eq!(res.headers()["location"], "/api/users/1");

        let body = json_body(res).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["email"], "alice@x.com");
        assert_eq!(body["full_name"], Value::Null);
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());
        assert_eq!(body["created_at"], body["updated_at"]);
    }

    #[tokio::test]
    async fn create_duplicate_is_400() {
        let app = build_app(AppState::fake());
        send(&app, Method::POST, "/api/users", Some(alice())).await;

        let dup = json!({"email": "alice@x.com", "username": "other", "password": "pw12345678"});
        let res = send(&app, Method::POST, "/api/users", Some(dup)).await;
        assert_eq!(res.status(), 400);
        assert_eq!(json_body(res).await["detail"], "Email already registered");
    }

    #[tokio::test]
    async fn create_invalid_payload_is_422() {
        let app = build_app(AppState::fake());
        let bad = json!({"email": "not-an-email", "username": "al", "password": "short"});
        let res = send(&app, Method::POST, "/api/users/", Some(bad)).await;
        assert_eq!(res.status(), 422);
        assert_eq!(json_body(res).await["errors"].as_array().unwrap().len(), 3);

        let missing = json!({"email": "a@x.com"});
        let res = send(&app, Method::POST, "/api/users/", Some(missing)).await;
        assert_eq!(res.status(), 422);
        assert_eq!(json_body(res).await["errors"][0]["field"], "body");
    }

    #[tokio::test]
    async fn get_and_list() {
        let app = build_app(AppState::fake());
        send(&app, Method::POST, "/api/users/", Some(alice())).await;

        let res = send(&app, Method::GET, "/api/users/1", None).await;
        assert_eq!(res.status(), 200);
        assert_eq!(json_body(res).await["username"], "alice");

        let res = send(&app, Method::GET, "/api/users/2", None).await;
        assert_eq!(res.status(), 404);
        assert_eq!(json_body(res).await["detail"], "User not found");

        let res = send(&app, Method::GET, "/api/users/", None).await;
        assert_eq!(res.status(), 200);
        assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_partial_update() {
        let app = build_app(AppState::fake());
        send(&app, Method::POST, "/api/users/", Some(alice())).await;

        let res = send(&app, Method::PUT, "/api/users/1", Some(json!({"full_name": "Alice L"}))).await;
        assert_eq!(res.status(), 200);
        let body = json_body(res).await;
        assert_eq!(body["full_name"], "Alice L");
        assert_eq!(body["email"], "alice@x.com");

        let res = send(&app, Method::PUT, "/api/users/1", Some(json!({"full_name": null}))).await;
        assert_eq!(json_body(res).await["full_name"], Value::Null);

        let res = send(&app, Method::PUT, "/api/users/9", Some(json!({}))).await;
        assert_eq!(res.status(), 404);

        let res = send(&app, Method::PUT, "/api/users/1", Some(json!({"password": "short"}))).await;
        assert_eq!(res.status(), 422);
    }

    #[tokio::test]
    async fn put_duplicate_username_is_400() {
        let app = build_app(AppState::fake());
        send(&app, Method::POST, "/api/users/", Some(alice())).await;
        let bob = json!({"email": "bob@x.com", "username": "bob", "password": "pw12345678"});
        send(&app, Method::POST, "/api/users/", Some(bob)).await;

        let res = send(&app, Method::PUT, "/api/users/2", Some(json!({"username": "alice"}))).await;
        assert_eq!(res.status(), 400);
        assert_eq!(json_body(res).await["detail"], "Username already taken");
    }

    #[tokio::test]
    async fn delete_then_404() {
        let app = build_app(AppState::fake());
        send(&app, Method::POST, "/api/users/", Some(alice())).await;

        let res = send(&app, Method::DELETE, "/api/users/1", None).await;
        assert_eq!(res.status(), 204);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        assert_eq!(send(&app, Method::DELETE, "/api/users/1", None).await.status(), 404);
        assert_eq!(send(&app, Method::GET, "/api/users/1", None).await.status(), 404);

        let res = send(&app, Method::POST, "/api/users/", Some(alice())).await;
        assert_eq!(json_body(res).await["id"], 2);
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let app = build_app(AppState::fake());
        let res = send(&app, Method::GET, "/api/users/abc", None).await;
        assert_eq!(res.status(), 400);
    }
}
