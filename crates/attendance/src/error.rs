use rollcall_database::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AttendanceError>;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("No attendance scan for student {student_id} in this session")]
    RecordNotFound { session_id: Uuid, student_id: String },

    #[error("Session {0} has ended")]
    SessionEnded(Uuid),

    /// Deliberately says nothing about whether the code was wrong or late.
    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,

    #[error("Export error: {0}")]
    Export(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<DatabaseError> for AttendanceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::SessionNotFound(id) => AttendanceError::SessionNotFound(id),
            DatabaseError::RecordNotFound {
                session_id,
                student_id,
            } => AttendanceError::RecordNotFound {
                session_id,
                student_id,
            },
            DatabaseError::SessionEnded(id) => AttendanceError::SessionEnded(id),
            DatabaseError::InvalidInput(msg) => AttendanceError::InvalidInput(msg),
            other => {
                tracing::error!("Attendance storage failure: {}", other);
                AttendanceError::Storage(other.to_string())
            }
        }
    }
}
