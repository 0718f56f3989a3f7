use chrono::Duration;

use crate::otp::{DEFAULT_OTP_DIGITS, DEFAULT_OTP_VALIDITY_SECONDS};

#[derive(Debug, Clone)]
pub struct AttendanceConfig {
    /// How long a freshly issued OTP stays valid.
    pub otp_validity: Duration,
    pub otp_digits: u32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            otp_validity: Duration::seconds(DEFAULT_OTP_VALIDITY_SECONDS),
            otp_digits: DEFAULT_OTP_DIGITS,
        }
    }
}

impl AttendanceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            otp_validity: std::env::var("OTP_VALIDITY_SECONDS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::seconds)
                .unwrap_or(defaults.otp_validity),
            otp_digits: std::env::var("OTP_DIGITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.otp_digits),
        }
    }
}
