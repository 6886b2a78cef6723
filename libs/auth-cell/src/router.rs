use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use shared_database::AppState;

use crate::handlers::{request_otp, validate, verify_otp};
use crate::services::{OtpService, TracingOtpSender};

pub fn auth_routes(state: Arc<AppState>) -> Router {
    let otp = Arc::new(OtpService::new(
        state.config.otp_ttl_minutes,
        state.config.otp_max_attempts,
        Box::new(TracingOtpSender),
    ));

    Router::new()
        .route("/otp/request", post(request_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/validate", get(validate))
        .layer(Extension(otp))
        .with_state(state)
}
