//! Gamer account handlers: wallet initialization, email auth, profile,
//! and the solo-play reward flow.

use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extract::AuthGamer;
use crate::auth::password;
use crate::error::{ApiError, ApiResult, Body};
use crate::realtime::Event;
use crate::storage::{Gamer, GamerUpdate, NewGamer};

use super::{AppState, created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub pubkey: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: Option<String>,
    #[serde(default)]
    pub google_auth: bool,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: Option<String>,
    #[serde(default)]
    pub google_auth: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    pub current_game: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardsRequest {
    pub reward_coins: i64,
}

fn session_payload(state: &AppState, gamer: &Gamer) -> ApiResult<serde_json::Value> {
    let (token, expires_in) = state
        .jwt
        .issue_token(&gamer.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(json!({ "token": token, "expiresIn": expires_in, "user": gamer }))
}

/// `POST /api/v1/game/initialize` — wallet-first sign-in. Finds or creates
/// the account for a pubkey and returns a session.
pub async fn initialize(
    State(state): State<AppState>,
    Body(req): Body<InitializeRequest>,
) -> ApiResult<Response> {
    let pubkey = req.pubkey.trim();
    if pubkey.is_empty() {
        return Err(ApiError::Validation("pubkey is required".into()));
    }

    let gamer = match state.db.get_gamer_by_pubkey(pubkey).await? {
        Some(existing) => {
            if existing.is_blocked {
                return Err(ApiError::Forbidden("Your account has been blocked".into()));
            }
            state.db.touch_gamer(&existing.id).await?;
            state.db.get_gamer(&existing.id).await?
        }
        None => {
            state
                .db
                .create_gamer(NewGamer {
                    pubkey: Some(pubkey.to_string()),
                    ..NewGamer::default()
                })
                .await?
        }
    };

    let payload = session_payload(&state, &gamer)?;
    Ok(success("User initialized successfully", payload))
}

/// `POST /api/v1/game/auth/signup`
///
/// Email accounts carry a password; googleAuth accounts carry none and
/// authenticate through the identity provider on every login.
pub async fn signup(
    State(state): State<AppState>,
    Body(req): Body<SignupRequest>,
) -> ApiResult<Response> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".into()));
    }

    let (hash, provider) = match (&req.password, req.google_auth) {
        (Some(_), true) | (None, false) => {
            return Err(ApiError::Validation(
                "Provide either a password or googleAuth, not both".into(),
            ));
        }
        (Some(password), false) => {
            if password.len() < 8 {
                return Err(ApiError::Validation(
                    "Password must be at least 8 characters".into(),
                ));
            }
            let hash = password::hash_password(password)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            (Some(hash), "email")
        }
        (None, true) => (None, "google"),
    };

    let gamer = state
        .db
        .create_gamer(NewGamer {
            email: Some(email),
            username: req.username,
            password_hash: hash,
            auth_provider: Some(provider.into()),
            ..NewGamer::default()
        })
        .await?;

    let payload = session_payload(&state, &gamer)?;
    Ok(created("Account created successfully", payload))
}

/// `POST /api/v1/game/auth/login`
///
/// With `googleAuth: true` the password check is skipped; the identity
/// provider is trusted to have verified the email upstream.
pub async fn login(
    State(state): State<AppState>,
    Body(req): Body<LoginRequest>,
) -> ApiResult<Response> {
    let email = req.email.trim().to_lowercase();
    let gamer = state
        .db
        .get_gamer_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".into()))?;

    if gamer.is_blocked {
        return Err(ApiError::Forbidden("Your account has been blocked".into()));
    }

    if !req.google_auth {
        let provided = req
            .password
            .as_deref()
            .ok_or_else(|| ApiError::Validation("password is required".into()))?;
        let stored = gamer
            .password_hash
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".into()))?;
        let valid = password::verify_password(provided, stored)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if !valid {
            return Err(ApiError::Unauthorized("Invalid email or password".into()));
        }
    }

    state.db.touch_gamer(&gamer.id).await?;
    let gamer = state.db.get_gamer(&gamer.id).await?;

    let payload = session_payload(&state, &gamer)?;
    Ok(success("Logged in successfully", payload))
}

/// `GET /api/v1/game/getGamer`
pub async fn get_gamer(AuthGamer(gamer): AuthGamer) -> Response {
    success("User fetched successfully", json!({ "user": gamer }))
}

/// `PATCH /api/v1/game/updateGamer`
///
/// A field outside the allow-list fails extraction and comes back as a 400
/// in the standard error shape.
pub async fn update_gamer(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(update): Body<GamerUpdate>,
) -> ApiResult<Response> {
    let updated = state.db.update_gamer(&gamer.id, &update).await?;
    state
        .registry
        .emit_to_user(&gamer.id, &Event::new("sync_profile", json!({ "user": updated })))
        .await;
    Ok(success("User updated successfully", json!({ "user": updated })))
}

/// `POST /api/v1/game/startGame`
pub async fn start_game(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<StartGameRequest>,
) -> ApiResult<Response> {
    let updated = state.db.start_game(&gamer.id, &req.current_game).await?;
    state
        .registry
        .emit_to_user(&gamer.id, &Event::new("sync_profile", json!({ "user": updated })))
        .await;
    Ok(success("Game started successfully", json!({ "user": updated })))
}

/// `POST /api/v1/game/claimRewards`
pub async fn claim_rewards(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<ClaimRewardsRequest>,
) -> ApiResult<Response> {
    let (updated, credited) = state.db.claim_rewards(&gamer.id, req.reward_coins).await?;
    if credited {
        state
            .registry
            .emit_to_user(&gamer.id, &Event::new("sync_profile", json!({ "user": updated })))
            .await;
        Ok(success("Rewards claimed successfully", json!({ "user": updated })))
    } else {
        Ok(success("No game in progress, nothing to claim", json!({ "user": updated })))
    }
}
