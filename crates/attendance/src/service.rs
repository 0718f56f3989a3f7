//! Attendance orchestration: sessions, OTPs, scans and verification.
//!
//! A session is `Active` from creation until the teacher ends it. OTPs
//! expire on their own; sessions never do. A student first scans (the record
//! is `Pending`) and later proves presence with the OTP that is live at the
//! moment of verification.

use crate::clock::Clock;
use crate::config::AttendanceConfig;
use crate::error::{AttendanceError, Result};
use crate::export::{ExportedFile, RecordExporter};
use crate::otp::OtpGenerator;
use chrono::Duration;
use rollcall_database::{AttendanceLedger, MemoryAttendanceLedger, MemorySessionStore, SessionStore};
use rollcall_models::{
    AttendanceRecord, IssuedOtp, NewSession, Session, SessionSummary, StudentIdentity,
};
use std::sync::Arc;
use uuid::Uuid;

pub struct AttendanceService {
    sessions: Arc<dyn SessionStore>,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
    otp_generator: OtpGenerator,
    otp_validity: Duration,
}

impl AttendanceService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        ledger: Arc<dyn AttendanceLedger>,
        clock: Arc<dyn Clock>,
        config: AttendanceConfig,
    ) -> Result<Self> {
        if config.otp_validity <= Duration::zero() {
            return Err(AttendanceError::InvalidInput(
                "OTP validity window must be positive".to_string(),
            ));
        }
        let otp_generator = OtpGenerator::new(clock.clone(), config.otp_digits)?;

        Ok(Self {
            sessions,
            ledger,
            clock,
            otp_generator,
            otp_validity: config.otp_validity,
        })
    }

    /// A service backed by the in-process stores.
    pub fn in_memory(clock: Arc<dyn Clock>, config: AttendanceConfig) -> Result<Self> {
        Self::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryAttendanceLedger::new()),
            clock,
            config,
        )
    }

    pub async fn create_session(&self, new_session: NewSession) -> Result<Session> {
        let session = self.sessions.create(&new_session, self.clock.now()).await?;

        tracing::info!(
            "Attendance session created: session_id={}, teacher_id={}, course={}, section={}",
            session.id,
            session.teacher_id,
            session.course,
            session.section
        );

        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<Session> {
        Ok(self.sessions.get(session_id).await?)
    }

    pub async fn list_teacher_sessions(&self, teacher_id: &str) -> Result<Vec<Session>> {
        Ok(self.sessions.list_by_teacher(teacher_id).await?)
    }

    /// Resolve the payload a student's scanner decoded from the QR code.
    pub async fn resolve_qr_token(&self, qr_token: &str) -> Result<Session> {
        let session_id = Session::parse_qr_token(qr_token)
            .ok_or_else(|| AttendanceError::InvalidInput("Malformed QR token".to_string()))?;
        self.get_session(session_id).await
    }

    /// Issue a new OTP, superseding any earlier one immediately.
    pub async fn generate_otp(&self, session_id: Uuid) -> Result<IssuedOtp> {
        let issued = self.otp_generator.generate(self.otp_validity);
        self.sessions.set_otp(session_id, &issued).await?;

        tracing::info!(
            "OTP issued: session_id={}, expires_at={}",
            session_id,
            issued.expires_at
        );

        Ok(issued)
    }

    /// Record presence-intent for a student. Re-scans return the first
    /// record unchanged.
    pub async fn submit_attendance(
        &self,
        session_id: Uuid,
        student: StudentIdentity,
    ) -> Result<AttendanceRecord> {
        let session = self.sessions.get(session_id).await?;
        if !session.is_active() {
            return Err(AttendanceError::SessionEnded(session_id));
        }

        let record = self
            .ledger
            .record_scan(session_id, &student, self.clock.now())
            .await?;

        tracing::info!(
            "Attendance recorded: session_id={}, student_id={}, record_id={}",
            session_id,
            record.student_id,
            record.id
        );

        Ok(record)
    }

    /// Upgrade a scanned record to verified with the currently live OTP.
    ///
    /// The clock is read once. A student with no scan gets `RecordNotFound`
    /// whatever the state of the OTP.
    pub async fn verify_otp(
        &self,
        session_id: Uuid,
        student_id: &str,
        code: &str,
    ) -> Result<AttendanceRecord> {
        let now = self.clock.now();

        let otp_valid = self
            .sessions
            .is_otp_valid(session_id, code, now)
            .await?;

        if self.ledger.get(session_id, student_id).await?.is_none() {
            return Err(AttendanceError::RecordNotFound {
                session_id,
                student_id: student_id.trim().to_string(),
            });
        }

        if !otp_valid {
            tracing::warn!(
                "OTP verification rejected: session_id={}, student_id={}",
                session_id,
                student_id
            );
            return Err(AttendanceError::InvalidOrExpiredOtp);
        }

        let record = self.ledger.mark_verified(session_id, student_id, now).await?;

        tracing::info!(
            "Attendance verified: session_id={}, student_id={}",
            session_id,
            record.student_id
        );

        Ok(record)
    }

    /// End a session. Already-verified records stay verified.
    pub async fn end_session(&self, session_id: Uuid) -> Result<Session> {
        let session = self.sessions.end(session_id, self.clock.now()).await?;

        tracing::info!(
            "Attendance session ended: session_id={}, ended_at={:?}",
            session_id,
            session.ended_at
        );

        Ok(session)
    }

    pub async fn list_records(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        self.sessions.get(session_id).await?;
        Ok(self.ledger.list_by_session(session_id).await?)
    }

    pub async fn session_summary(&self, session_id: Uuid) -> Result<SessionSummary> {
        let session = self.sessions.get(session_id).await?;
        let records = self.ledger.list_by_session(session_id).await?;
        let verified = records.iter().filter(|r| r.verified).count();

        Ok(SessionSummary {
            session_id,
            state: session.state,
            total: records.len(),
            verified,
            pending: records.len() - verified,
        })
    }

    pub async fn export_records(
        &self,
        session_id: Uuid,
        exporter: &dyn RecordExporter,
    ) -> Result<ExportedFile> {
        let session = self.sessions.get(session_id).await?;
        let records = self.ledger.list_by_session(session_id).await?;
        let bytes = exporter.render(&session, &records)?;

        tracing::info!(
            "Attendance exported: session_id={}, records={}",
            session_id,
            records.len()
        );

        Ok(ExportedFile::build(exporter, &session, bytes))
    }
}
