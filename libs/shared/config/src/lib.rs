use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub admin_email: String,
    pub port: u16,
    pub otp_ttl_minutes: i64,
    pub otp_max_attempts: u32,
    pub token_ttl_hours: i64,
    pub slot_scan_ceiling_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_EMAIL not set, using empty value");
                    String::new()
                }),
            port: parse_env("PORT", 3000),
            otp_ttl_minutes: parse_env("OTP_TTL_MINUTES", 10),
            otp_max_attempts: parse_env("OTP_MAX_ATTEMPTS", 5),
            token_ttl_hours: parse_env("TOKEN_TTL_HOURS", 12),
            slot_scan_ceiling_days: parse_env("SLOT_SCAN_CEILING_DAYS", 150),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !self.jwt_secret.is_empty()
            && !self.admin_email.is_empty()
    }
}

fn parse_env<T: std::str::FromStr + std::fmt::Display + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has a non-numeric value, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}
