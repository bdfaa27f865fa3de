use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::models::{User, UserId};
use crate::store::UserStoreError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/user-id", post(user_id_by_username))
}

fn internal(context: &str, e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("{}: {}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{} failed", context))
}

/* ---------- SIGNUP ---------- */

#[derive(Debug, Deserialize, Validate)]
struct CredentialsRequest {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    password: String,
}

impl CredentialsRequest {
    // Имя проверяется и хранится без пробелов по краям
    fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password,
        }
    }
}

#[derive(Debug, Serialize)]
struct SignupResponse {
    message: &'static str,
    user: User,
}

// POST /api/signup
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let req = req.normalized();
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let hash = state
        .auth
        .hash_password(&req.password)
        .await
        .map_err(|e| internal("signup", e))?;

    match state.users.create(&req.username, &hash).await {
        Ok(user) => {
            tracing::info!("user {} signed up as {}", user.id, user.username);
            Ok((
                StatusCode::CREATED,
                Json(SignupResponse { message: "User created successfully", user }),
            ))
        }
        Err(UserStoreError::UsernameTaken(name)) => Err((
            StatusCode::BAD_REQUEST,
            format!("username `{}` is already taken", name),
        )),
        Err(e) => Err(internal("signup", e)),
    }
}

/* ---------- LOGIN ---------- */

#[derive(Debug, Serialize)]
struct LoginResponse {
    message: &'static str,
    token: String,
}

// POST /api/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let unauthorized = || (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let user = state
        .users
        .find_by_username(req.username.trim())
        .await
        .map_err(|e| internal("login", e))?
        .ok_or_else(unauthorized)?;

    let ok = state
        .auth
        .verify_password(&req.password, &user.password_hash)
        .await
        .map_err(|e| internal("login", e))?;
    if !ok {
        return Err(unauthorized());
    }

    let token = state
        .auth
        .issue_token(&user)
        .map_err(|e| internal("login", e))?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse { message: "Login successful", token }),
    ))
}

/* ---------- USER ID ---------- */

#[derive(Debug, Deserialize)]
struct UserIdRequest {
    username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdResponse {
    user_id: UserId,
}

// POST /api/user-id
async fn user_id_by_username(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UserIdRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .users
        .find_by_username(req.username.trim())
        .await
        .map_err(|e| internal("user lookup", e))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;

    Ok((StatusCode::OK, Json(UserIdResponse { user_id: user.id })))
}
