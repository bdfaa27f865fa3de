use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use std::sync::Arc;

use crate::models::UserId;

/// Пользователь, прошедший проверку токена. Ядро получает только `user_id`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Получаем заголовок Authorization
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // Проверяем что это Bearer
        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = state.auth.verify_token(token).map_err(|e| {
            tracing::debug!("rejected token: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthUser {
            user_id: claims.user_id(),
        })
    }
}
