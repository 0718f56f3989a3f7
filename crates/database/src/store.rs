//! Storage seams for sessions and attendance records.
//!
//! Each trait is the sole mutator of its entity. Implementations must make
//! every method atomic at single-session / single-record granularity; no
//! operation spans more than one session.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_models::{AttendanceRecord, IssuedOtp, NewSession, Session, StudentIdentity};
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new `Active` session. Fails with `InvalidInput` on blank
    /// or oversized fields.
    async fn create(&self, new_session: &NewSession, created_at: DateTime<Utc>) -> Result<Session>;

    async fn get(&self, session_id: Uuid) -> Result<Session>;

    /// Replace the session's OTP in one write. Fails with `SessionEnded`
    /// once the session is terminated.
    async fn set_otp(&self, session_id: Uuid, issued: &IssuedOtp) -> Result<Session>;

    /// Terminate the session. Ending twice is a no-op.
    async fn end(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<Session>;

    /// Sessions owned by a teacher, newest first.
    async fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<Session>>;

    /// The authoritative OTP check, evaluated on a single snapshot of the
    /// session at server time `at`.
    async fn is_otp_valid(&self, session_id: Uuid, code: &str, at: DateTime<Utc>) -> Result<bool> {
        let session = self.get(session_id).await?;
        Ok(session.accepts_otp(code, at))
    }
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Create a `Pending` record unless one already exists for this student,
    /// in which case the existing record is returned untouched.
    async fn record_scan(
        &self,
        session_id: Uuid,
        student: &StudentIdentity,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord>;

    async fn get(&self, session_id: Uuid, student_id: &str) -> Result<Option<AttendanceRecord>>;

    /// Flip a scanned record to verified. Idempotent; `NotFound` without a
    /// prior scan.
    async fn mark_verified(
        &self,
        session_id: Uuid,
        student_id: &str,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord>;

    /// All records of a session ordered by scan time, then id.
    async fn list_by_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>>;
}
