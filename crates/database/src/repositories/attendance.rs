use crate::error::{DatabaseError, Result};
use crate::store::AttendanceLedger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_models::{AttendanceRecord, StudentIdentity};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// PostgreSQL-backed [`AttendanceLedger`].
///
/// The `(session_id, student_id)` unique constraint decides scan races; the
/// loser's `INSERT` does nothing and it reads back the winner's row.
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceLedger for AttendanceRepository {
    async fn record_scan(
        &self,
        session_id: Uuid,
        student: &StudentIdentity,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        student.validate()?;
        let draft = AttendanceRecord::new(session_id, student, at);

        let inserted = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance_records (
                id, session_id, student_id, student_name, roll_number,
                scanned_at, verified, verified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, NULL)
            ON CONFLICT (session_id, student_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(draft.id)
        .bind(draft.session_id)
        .bind(&draft.student_id)
        .bind(&draft.student_name)
        .bind(&draft.roll_number)
        .bind(draft.timestamp)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(record) = inserted {
            return Ok(record);
        }

        self.get(session_id, &draft.student_id)
            .await?
            .ok_or_else(|| DatabaseError::record_not_found(session_id, &draft.student_id))
    }

    async fn get(&self, session_id: Uuid, student_id: &str) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE session_id = $1 AND student_id = $2
            "#,
        )
        .bind(session_id)
        .bind(student_id.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn mark_verified(
        &self,
        session_id: Uuid,
        student_id: &str,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            UPDATE attendance_records
            SET verified = TRUE,
                verified_at = COALESCE(verified_at, $3)
            WHERE session_id = $1 AND student_id = $2
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(student_id.trim())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::record_not_found(session_id, student_id))
    }

    async fn list_by_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE session_id = $1
            ORDER BY scanned_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
