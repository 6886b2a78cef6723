use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unknown email")]
    UnknownEmail,

    #[error("Code expired or never requested")]
    CodeExpired,

    #[error("Invalid code")]
    CodeMismatch,

    #[error("Too many attempts, request a new code")]
    TooManyAttempts,

    #[error("Token error: {0}")]
    TokenError(String),
}

impl From<AuthError> for shared_models::error::AppError {
    fn from(err: AuthError) -> Self {
        shared_models::error::AppError::Auth(err.to_string())
    }
}
