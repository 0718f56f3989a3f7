use crate::clock::Clock;
use crate::error::{AttendanceError, Result};
use chrono::Duration;
use rand::{rngs::OsRng, Rng};
use rollcall_models::IssuedOtp;
use std::sync::Arc;

pub const DEFAULT_OTP_DIGITS: u32 = 6;
pub const DEFAULT_OTP_VALIDITY_SECONDS: i64 = 20; // matches the dashboard countdown

const MIN_OTP_DIGITS: u32 = 4;
const MAX_OTP_DIGITS: u32 = 9;

/// Mints fixed-width numeric codes from the OS CSPRNG.
///
/// Codes are sampled uniformly over `0..10^digits` and zero-padded, so
/// "000042" is as likely as "482913". Nothing is persisted here.
pub struct OtpGenerator {
    clock: Arc<dyn Clock>,
    digits: u32,
}

impl OtpGenerator {
    pub fn new(clock: Arc<dyn Clock>, digits: u32) -> Result<Self> {
        if !(MIN_OTP_DIGITS..=MAX_OTP_DIGITS).contains(&digits) {
            return Err(AttendanceError::InvalidInput(format!(
                "OTP length must be between {} and {} digits, got {}",
                MIN_OTP_DIGITS, MAX_OTP_DIGITS, digits
            )));
        }
        Ok(Self { clock, digits })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Draw a new code valid from now until `now + validity`.
    pub fn generate(&self, validity: Duration) -> IssuedOtp {
        let mut rng = OsRng;
        let value = rng.gen_range(0..10u32.pow(self.digits));

        IssuedOtp {
            otp: format_code(value, self.digits),
            expires_at: self.clock.now() + validity,
        }
    }
}

fn format_code(value: u32, digits: u32) -> String {
    format!("{:0width$}", value, width = digits as usize)
}
