use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::validation::not_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Ended,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// One class meeting's attendance window, owned by a single teacher.
///
/// `otp` and `otp_expires_at` are only ever written together through
/// [`Session::issue_otp`] and [`Session::end`], so both are set or both are
/// unset. An ended session never carries an OTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub teacher_id: String,
    pub subject: String,
    pub section: String,
    pub course: String,
    pub qr_token: String,
    pub otp: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a fresh `Active` session. Input is expected to be validated.
    pub fn new(id: Uuid, new_session: &NewSession, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            teacher_id: new_session.teacher_id.trim().to_string(),
            subject: new_session.subject.trim().to_string(),
            section: new_session.section.trim().to_string(),
            course: new_session.course.trim().to_string(),
            qr_token: Self::qr_token_for(id),
            otp: None,
            otp_expires_at: None,
            state: SessionState::Active,
            created_at,
            ended_at: None,
        }
    }

    /// The QR payload for a session is the hyphen-less form of its id.
    pub fn qr_token_for(id: Uuid) -> String {
        id.simple().to_string()
    }

    /// Map a scanned QR payload back to the session id it encodes.
    pub fn parse_qr_token(token: &str) -> Option<Uuid> {
        Uuid::try_parse(token.trim()).ok()
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The live OTP and its expiry, if one has been issued.
    pub fn current_otp(&self) -> Option<(&str, DateTime<Utc>)> {
        match (&self.otp, self.otp_expires_at) {
            (Some(code), Some(expires_at)) => Some((code.as_str(), expires_at)),
            _ => None,
        }
    }

    /// Replace the live OTP. Returns false (and changes nothing) once ended.
    pub fn issue_otp(&mut self, issued: &IssuedOtp) -> bool {
        if !self.is_active() {
            return false;
        }
        self.otp = Some(issued.otp.clone());
        self.otp_expires_at = Some(issued.expires_at);
        true
    }

    /// Terminate the session. The first `ended_at` wins.
    pub fn end(&mut self, at: DateTime<Utc>) {
        self.state = SessionState::Ended;
        self.otp = None;
        self.otp_expires_at = None;
        if self.ended_at.is_none() {
            self.ended_at = Some(at);
        }
    }

    /// Whether `code` is the live OTP at instant `at`.
    ///
    /// Expiry is exclusive: a code presented exactly at `otp_expires_at` is
    /// rejected.
    pub fn accepts_otp(&self, code: &str, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.current_otp() {
            Some((live, expires_at)) => at < expires_at && constant_time_compare(live, code),
            None => false,
        }
    }

    /// The session as served over HTTP. The OTP is only ever handed out by
    /// the endpoint that issues it.
    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            teacher_id: self.teacher_id.clone(),
            subject: self.subject.clone(),
            section: self.section.clone(),
            course: self.course.clone(),
            qr_token: self.qr_token.clone(),
            state: self.state,
            created_at: self.created_at,
            ended_at: self.ended_at,
        }
    }

    pub fn public_view(&self) -> SessionPublicView {
        SessionPublicView {
            id: self.id,
            subject: self.subject.clone(),
            section: self.section.clone(),
            course: self.course.clone(),
            state: self.state,
        }
    }
}

/// Constant-time string comparison so response timing says nothing about
/// how many leading digits of a guess were right.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Request body for creating a session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSession {
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub teacher_id: String,

    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub subject: String,

    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub section: String,

    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub course: String,
}

/// A freshly minted OTP as handed to the teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedOtp {
    pub otp: String,
    pub expires_at: DateTime<Utc>,
}

/// Dashboard view of a session, without the live OTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Uuid,
    pub teacher_id: String,
    pub subject: String,
    pub section: String,
    pub course: String,
    pub qr_token: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// What a student sees after scanning the QR code. Never carries the OTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPublicView {
    pub id: Uuid,
    pub subject: String,
    pub section: String,
    pub course: String,
    pub state: SessionState,
}

/// Roster counts for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub state: SessionState,
    pub total: usize,
    pub verified: usize,
    pub pending: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_session() -> NewSession {
        NewSession {
            teacher_id: "t-1".to_string(),
            subject: " Algorithms ".to_string(),
            section: "A".to_string(),
            course: "CS301".to_string(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_new_session_is_active_without_otp() {
        let id = Uuid::new_v4();
        let session = Session::new(id, &new_session(), t0());
        assert!(session.is_active());
        assert_eq!(session.subject, "Algorithms");
        assert_eq!(session.qr_token, id.simple().to_string());
        assert!(session.current_otp().is_none());
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_qr_token_round_trip() {
        let id = Uuid::new_v4();
        let token = Session::qr_token_for(id);
        assert_eq!(Session::parse_qr_token(&token), Some(id));
        assert_eq!(Session::parse_qr_token("not-a-session"), None);
    }

    #[test]
    fn test_otp_expiry_is_exclusive() {
        let mut session = Session::new(Uuid::new_v4(), &new_session(), t0());
        let expires_at = t0() + Duration::seconds(20);
        assert!(session.issue_otp(&IssuedOtp {
            otp: "482913".to_string(),
            expires_at,
        }));

        assert!(session.accepts_otp("482913", t0()));
        assert!(session.accepts_otp("482913", expires_at - Duration::milliseconds(1)));
        assert!(!session.accepts_otp("482913", expires_at));
        assert!(!session.accepts_otp("482914", t0()));
        assert!(!session.accepts_otp("48291", t0()));
    }

    #[test]
    fn test_end_clears_otp_and_keeps_first_end_time() {
        let mut session = Session::new(Uuid::new_v4(), &new_session(), t0());
        session.issue_otp(&IssuedOtp {
            otp: "000123".to_string(),
            expires_at: t0() + Duration::seconds(20),
        });

        session.end(t0() + Duration::seconds(5));
        session.end(t0() + Duration::seconds(9));

        assert_eq!(session.state, SessionState::Ended);
        assert_eq!(session.otp, None);
        assert_eq!(session.otp_expires_at, None);
        assert_eq!(session.ended_at, Some(t0() + Duration::seconds(5)));
        assert!(!session.accepts_otp("000123", t0()));
    }

    #[test]
    fn test_view_omits_otp() {
        let mut session = Session::new(Uuid::new_v4(), &new_session(), t0());
        session.issue_otp(&IssuedOtp {
            otp: "482913".to_string(),
            expires_at: t0() + Duration::seconds(20),
        });

        let json = serde_json::to_value(session.view()).unwrap();
        assert!(json.get("otp").is_none());
        assert!(json.get("otp_expires_at").is_none());
        assert_eq!(json["qr_token"], session.qr_token.as_str());
    }

    #[test]
    fn test_ended_session_refuses_new_otp() {
        let mut session = Session::new(Uuid::new_v4(), &new_session(), t0());
        session.end(t0());
        assert!(!session.issue_otp(&IssuedOtp {
            otp: "111111".to_string(),
            expires_at: t0() + Duration::seconds(20),
        }));
        assert!(session.current_otp().is_none());
    }

    #[test]
    fn test_new_session_validation() {
        assert!(new_session().validate().is_ok());

        let mut blank = new_session();
        blank.section = "  ".to_string();
        assert!(blank.validate().is_err());

        let mut empty = new_session();
        empty.teacher_id = String::new();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&SessionState::Ended).unwrap();
        assert_eq!(json, "\"ended\"");
        assert_eq!(SessionState::Active.to_string(), "active");
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("123456", "123456"));
        assert!(!constant_time_compare("123456", "123457"));
        assert!(!constant_time_compare("123456", "12345"));
    }
}
