pub mod otp;

pub use otp::{OtpSender, OtpService, TracingOtpSender};
