use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("No attendance scan for student {student_id} in session {session_id}")]
    RecordNotFound { session_id: Uuid, student_id: String },

    #[error("Session {0} has ended")]
    SessionEnded(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Other(String),
}

impl DatabaseError {
    pub fn session_not_found(session_id: Uuid) -> Self {
        Self::SessionNotFound(session_id)
    }

    pub fn record_not_found(session_id: Uuid, student_id: &str) -> Self {
        Self::RecordNotFound {
            session_id,
            student_id: student_id.trim().to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for DatabaseError {
    fn from(err: validator::ValidationErrors) -> Self {
        DatabaseError::InvalidInput(err.to_string())
    }
}
