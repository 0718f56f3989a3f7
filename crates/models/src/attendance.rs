use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::validation::not_blank;

/// A student's attendance claim within one session.
///
/// At most one record exists per `(session_id, student_id)`; `verified` only
/// ever moves from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    #[sqlx(rename = "scanned_at")]
    pub timestamp: DateTime<Utc>,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    pub fn new(session_id: Uuid, student: &StudentIdentity, scanned_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            student_id: student.student_id.trim().to_string(),
            student_name: student.student_name.trim().to_string(),
            roll_number: student.roll_number.trim().to_string(),
            timestamp: scanned_at,
            verified: false,
            verified_at: None,
        }
    }

    /// Returns true if this call flipped the record to verified.
    pub fn mark_verified(&mut self, at: DateTime<Utc>) -> bool {
        if self.verified {
            return false;
        }
        self.verified = true;
        self.verified_at = Some(at);
        true
    }

    pub fn status(&self) -> AttendanceStatus {
        if self.verified {
            AttendanceStatus::Verified
        } else {
            AttendanceStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Pending,
    Verified,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Verified => write!(f, "Verified"),
        }
    }
}

/// Who is claiming attendance, as typed into the student form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StudentIdentity {
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub student_id: String,

    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub student_name: String,

    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub roll_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAttendanceRequest {
    pub session_id: Uuid,

    #[serde(flatten)]
    #[validate(nested)]
    pub student: StudentIdentity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub session_id: Uuid,
    pub student_id: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn alice() -> StudentIdentity {
        StudentIdentity {
            student_id: "stu1".to_string(),
            student_name: "Alice".to_string(),
            roll_number: "R1".to_string(),
        }
    }

    #[test]
    fn test_mark_verified_is_one_way() {
        let t0 = Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap();
        let mut record = AttendanceRecord::new(Uuid::new_v4(), &alice(), t0);
        assert_eq!(record.status(), AttendanceStatus::Pending);

        assert!(record.mark_verified(t0 + Duration::seconds(3)));
        assert!(!record.mark_verified(t0 + Duration::seconds(8)));

        assert_eq!(record.status(), AttendanceStatus::Verified);
        assert_eq!(record.verified_at, Some(t0 + Duration::seconds(3)));
        assert_eq!(record.timestamp, t0);
    }

    #[test]
    fn test_submit_request_flattens_student_fields() {
        let session_id = Uuid::new_v4();
        let json = serde_json::json!({
            "session_id": session_id,
            "student_id": "stu1",
            "student_name": "Alice",
            "roll_number": "R1",
        });

        let request: SubmitAttendanceRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.session_id, session_id);
        assert_eq!(request.student.student_name, "Alice");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_submit_request_rejects_blank_roll_number() {
        let request = SubmitAttendanceRequest {
            session_id: Uuid::new_v4(),
            student: StudentIdentity {
                roll_number: " ".to_string(),
                ..alice()
            },
        };
        assert!(request.validate().is_err());
    }
}
