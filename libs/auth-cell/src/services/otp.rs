use chrono::Duration;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use shared_utils::ttl_cache::TtlCache;

use crate::models::AuthError;

/// Delivery seam: production wires a mailer here, development logs the code.
pub trait OtpSender: Send + Sync {
    fn deliver(&self, email: &str, code: &str);
}

/// Stand-in delivery for local runs; the code lands in the server log.
pub struct TracingOtpSender;

impl OtpSender for TracingOtpSender {
    fn deliver(&self, email: &str, code: &str) {
        info!("OTP for {}: {}", email, code);
    }
}

struct OtpChallenge {
    code_hash: String,
    attempts: u32,
}

/// One-time login codes for the single admin account. Codes live in an
/// expiring in-process store, hashed, single-use and attempt-limited.
pub struct OtpService {
    store: TtlCache<String, OtpChallenge>,
    sender: Box<dyn OtpSender>,
    max_attempts: u32,
}

impl OtpService {
    pub fn new(ttl_minutes: i64, max_attempts: u32, sender: Box<dyn OtpSender>) -> Self {
        Self {
            store: TtlCache::new(Duration::minutes(ttl_minutes)),
            sender,
            max_attempts,
        }
    }

    /// Generate a six-digit code, store its hash and hand the clear text to
    /// the delivery seam. Re-requesting replaces any pending code.
    pub fn issue(&self, email: &str) {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let key = normalize(email);

        self.store.insert(
            key.clone(),
            OtpChallenge {
                code_hash: hash_code(&code),
                attempts: 0,
            },
        );

        debug!("OTP issued for {}", key);
        self.sender.deliver(email, &code);
    }

    pub fn verify(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let key = normalize(email);
        let offered = hash_code(code.trim());

        let outcome = self.store.update(&key, |challenge| {
            challenge.attempts += 1;
            (challenge.attempts, challenge.code_hash == offered)
        });

        match outcome {
            None => Err(AuthError::CodeExpired),
            Some((_, true)) => {
                // Single use: a verified code is gone.
                self.store.take(&key);
                Ok(())
            }
            Some((attempts, false)) if attempts >= self.max_attempts => {
                self.store.take(&key);
                Err(AuthError::TooManyAttempts)
            }
            Some(_) => Err(AuthError::CodeMismatch),
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_code(code: &str) -> String {
    format!("{:x}", Sha256::digest(code.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::{Arc, Mutex};

    struct CaptureSender {
        last: Arc<Mutex<Option<String>>>,
    }

    impl OtpSender for CaptureSender {
        fn deliver(&self, _email: &str, code: &str) {
            *self.last.lock().unwrap() = Some(code.to_string());
        }
    }

    fn service(ttl_minutes: i64, max_attempts: u32) -> (OtpService, Arc<Mutex<Option<String>>>) {
        let last = Arc::new(Mutex::new(None));
        let sender = CaptureSender { last: last.clone() };
        (
            OtpService::new(ttl_minutes, max_attempts, Box::new(sender)),
            last,
        )
    }

    fn last_code(last: &Arc<Mutex<Option<String>>>) -> String {
        last.lock().unwrap().clone().expect("no code delivered")
    }

    #[test]
    fn issued_code_verifies_once() {
        let (service, last) = service(10, 5);
        service.issue("Admin@Clinic.Test");
        let code = last_code(&last);
        assert_eq!(code.len(), 6);

        // Email comparison is case- and whitespace-insensitive.
        assert!(service.verify(" admin@clinic.test ", &code).is_ok());
        assert_matches!(
            service.verify("admin@clinic.test", &code),
            Err(AuthError::CodeExpired)
        );
    }

    #[test]
    fn wrong_code_is_rejected_but_the_challenge_survives() {
        let (service, last) = service(10, 5);
        service.issue("admin@clinic.test");
        let code = last_code(&last);

        assert_matches!(
            service.verify("admin@clinic.test", "000000"),
            Err(AuthError::CodeMismatch)
        );
        assert!(service.verify("admin@clinic.test", &code).is_ok());
    }

    #[test]
    fn attempts_are_capped() {
        let (service, last) = service(10, 3);
        service.issue("admin@clinic.test");
        let code = last_code(&last);

        for _ in 0..2 {
            assert_matches!(
                service.verify("admin@clinic.test", "999999"),
                Err(AuthError::CodeMismatch)
            );
        }
        assert_matches!(
            service.verify("admin@clinic.test", "999999"),
            Err(AuthError::TooManyAttempts)
        );

        // The challenge is burned; even the right code no longer works.
        assert_matches!(
            service.verify("admin@clinic.test", &code),
            Err(AuthError::CodeExpired)
        );
    }

    #[test]
    fn expired_code_is_rejected() {
        let (service, last) = service(0, 5);
        service.issue("admin@clinic.test");
        let code = last_code(&last);

        assert_matches!(
            service.verify("admin@clinic.test", &code),
            Err(AuthError::CodeExpired)
        );
    }

    #[test]
    fn reissuing_replaces_the_pending_code() {
        let (service, last) = service(10, 5);
        service.issue("admin@clinic.test");
        let first = last_code(&last);
        service.issue("admin@clinic.test");
        let second = last_code(&last);

        if first != second {
            assert_matches!(
                service.verify("admin@clinic.test", &first),
                Err(AuthError::CodeMismatch)
            );
        }
        assert!(service.verify("admin@clinic.test", &second).is_ok());
    }
}
