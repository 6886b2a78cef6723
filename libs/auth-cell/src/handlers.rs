use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, validate_token};

use crate::models::{AuthError, LoginResponse, OtpRequest, OtpVerifyRequest};
use crate::services::OtpService;

fn require_admin_email(state: &AppState, email: &str) -> Result<(), AppError> {
    let configured = state.config.admin_email.trim().to_lowercase();
    if configured.is_empty() || email.trim().to_lowercase() != configured {
        return Err(AuthError::UnknownEmail.into());
    }
    Ok(())
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

#[axum::debug_handler]
pub async fn request_otp(
    State(state): State<Arc<AppState>>,
    Extension(otp): Extension<Arc<OtpService>>,
    Json(request): Json<OtpRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("OTP requested");
    require_admin_email(&state, &request.email)?;

    otp.issue(&request.email);

    Ok(Json(json!({ "sent": true })))
}

#[axum::debug_handler]
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Extension(otp): Extension<Arc<OtpService>>,
    Json(request): Json<OtpVerifyRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    require_admin_email(&state, &request.email)?;

    otp.verify(&request.email, &request.code)?;

    let token = issue_token(
        &state.config.admin_email,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(AppError::Auth)?;

    Ok(Json(LoginResponse { token }))
}

#[axum::debug_handler]
pub async fn validate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match validate_token(&token, &state.config.jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}
