//! Request extractors for protected routes.
//!
//! `AuthGamer` resolves a bearer token to a live gamer account and rejects
//! blocked accounts before the handler runs. `AuthAdmin` does the same for
//! admin sessions, served from the admin snapshot cache when warm.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::routes::AppState;
use crate::storage::{AdminSnapshot, Gamer};

const ADMIN_CACHE_TTL: Duration = Duration::from_secs(3600);

/// An authenticated, non-blocked gamer.
pub struct AuthGamer(pub Gamer);

/// An authenticated admin session.
pub struct AuthAdmin(pub AdminSnapshot);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Authentication token is missing".into()))
}

impl FromRequestParts<AppState> for AuthGamer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state
            .jwt
            .validate(token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        let gamer = state.db.get_gamer(&claims.sub).await.map_err(|e| match e {
            ApiError::NotFound(_) => {
                ApiError::Unauthorized("Account for this token no longer exists".into())
            }
            other => other,
        })?;

        if gamer.is_blocked {
            return Err(ApiError::Forbidden("Your account has been blocked".into()));
        }

        Ok(Self(gamer))
    }
}

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state
            .jwt
            .validate(token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        let cache_key = format!("admin:{}", claims.sub);
        if let Some(raw) = state.cache.get(&cache_key).await {
            if let Ok(snapshot) = serde_json::from_str::<AdminSnapshot>(&raw) {
                return Ok(Self(snapshot));
            }
        }

        let admin = state.db.get_admin(&claims.sub).await.map_err(|e| match e {
            ApiError::NotFound(_) => {
                ApiError::Unauthorized("Admin session is no longer valid".into())
            }
            other => other,
        })?;

        let snapshot = AdminSnapshot::from(&admin);
        if let Ok(raw) = serde_json::to_string(&snapshot) {
            state.cache.set(&cache_key, raw, ADMIN_CACHE_TTL).await;
        }

        Ok(Self(snapshot))
    }
}
