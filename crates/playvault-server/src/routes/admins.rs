//! Admin handlers: login, provisioning, and the OTP password-reset flow.

use std::time::Duration;

use axum::extract::State;
use axum::response::Response;
use rand::RngExt;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::auth::extract::AuthAdmin;
use crate::auth::password;
use crate::error::{ApiError, ApiResult, Body};
use crate::storage::AdminSnapshot;
use crate::storage::status::AdminRole;

use super::{AppState, created, success};

/// Reset codes are one-shot and expire after ten minutes.
const OTP_TTL: Duration = Duration::from_secs(600);
const ADMIN_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAdminRequest {
    pub email: String,
    pub password: String,
    pub role: Option<AdminRole>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// `POST /api/v1/admin/login`
pub async fn login(
    State(state): State<AppState>,
    Body(req): Body<AdminLoginRequest>,
) -> ApiResult<Response> {
    let admin = state
        .db
        .get_admin_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".into()))?;

    let valid = password::verify_password(&req.password, &admin.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    let (token, expires_in) = state
        .jwt
        .issue_token(&admin.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let snapshot = AdminSnapshot::from(&admin);
    if let Ok(raw) = serde_json::to_string(&snapshot) {
        state
            .cache
            .set(&format!("admin:{}", admin.id), raw, ADMIN_CACHE_TTL)
            .await;
    }

    Ok(success(
        "Logged in successfully",
        json!({ "token": token, "expiresIn": expires_in, "admin": snapshot }),
    ))
}

/// `POST /api/v1/admin/addAdmin`
pub async fn add_admin(
    State(state): State<AppState>,
    Body(req): Body<AddAdminRequest>,
) -> ApiResult<Response> {
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    let hash = password::hash_password(&req.password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let admin = state
        .db
        .create_admin(&req.email, &hash, req.role.unwrap_or(AdminRole::Support))
        .await?;

    let mail_sent = match state
        .mailer
        .send_credentials(&admin.email, &req.password)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to send admin credentials");
            false
        }
    };

    Ok(created(
        "Admin created successfully",
        json!({ "admin": AdminSnapshot::from(&admin), "emailSent": mail_sent }),
    ))
}

/// `POST /api/v1/admin/forgotPassword` — issue a one-shot reset code. The
/// response is the same whether the email exists or not.
pub async fn forgot_password(
    State(state): State<AppState>,
    Body(req): Body<ForgotPasswordRequest>,
) -> ApiResult<Response> {
    let email = req.email.trim().to_lowercase();
    if let Some(admin) = state.db.get_admin_by_email(&email).await? {
        let code = format!("{:05}", rand::rng().random_range(0..100_000u32));
        state.cache.set(&format!("otp:{email}"), code.clone(), OTP_TTL).await;
        if let Err(e) = state.mailer.send_reset_code(&admin.email, &code).await {
            warn!(error = %e, "Failed to send reset code");
        }
    }

    Ok(success(
        "If that email exists, a reset code has been sent",
        json!({}),
    ))
}

/// `PATCH /api/v1/admin/updatePassword` — redeem a reset code. The code is
/// consumed on the first attempt, right or wrong.
pub async fn update_password(
    State(state): State<AppState>,
    Body(req): Body<UpdatePasswordRequest>,
) -> ApiResult<Response> {
    if req.new_password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let email = req.email.trim().to_lowercase();
    let stored = state
        .cache
        .take(&format!("otp:{email}"))
        .await
        .ok_or_else(|| ApiError::Expired("Reset code is invalid or has expired".into()))?;
    if stored != req.code {
        return Err(ApiError::Unauthorized("Reset code is incorrect".into()));
    }

    let admin = state
        .db
        .get_admin_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin not found".into()))?;

    let hash = password::hash_password(&req.new_password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state.db.update_admin_password(&admin.id, &hash).await?;
    state.cache.remove(&format!("admin:{}", admin.id)).await;

    Ok(success("Password updated successfully", json!({})))
}

/// `GET /api/v1/admin/getAdmin`
pub async fn get_admin(AuthAdmin(snapshot): AuthAdmin) -> Response {
    success("Admin fetched successfully", json!({ "admin": snapshot }))
}

/// `POST /api/v1/admin/logout` — drop the cached session snapshot.
pub async fn logout(
    State(state): State<AppState>,
    AuthAdmin(snapshot): AuthAdmin,
) -> Response {
    state.cache.remove(&format!("admin:{}", snapshot.id)).await;
    success("Logged out successfully", json!({}))
}
