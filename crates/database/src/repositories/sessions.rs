use crate::error::{DatabaseError, Result};
use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_models::{IssuedOtp, NewSession, Session};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// PostgreSQL-backed [`SessionStore`].
///
/// Every mutation is a single `UPDATE ... RETURNING` statement, so the
/// `(otp, otp_expires_at)` pair is never observed half-written.
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find(&self, session_id: Uuid) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM attendance_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create(&self, new_session: &NewSession, created_at: DateTime<Utc>) -> Result<Session> {
        new_session.validate()?;
        let draft = Session::new(Uuid::new_v4(), new_session, created_at);

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO attendance_sessions (
                id, teacher_id, subject, section, course,
                qr_token, state, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(draft.id)
        .bind(&draft.teacher_id)
        .bind(&draft.subject)
        .bind(&draft.section)
        .bind(&draft.course)
        .bind(&draft.qr_token)
        .bind(draft.state)
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get(&self, session_id: Uuid) -> Result<Session> {
        self.find(session_id)
            .await?
            .ok_or_else(|| DatabaseError::session_not_found(session_id))
    }

    async fn set_otp(&self, session_id: Uuid, issued: &IssuedOtp) -> Result<Session> {
        let updated = sqlx::query_as::<_, Session>(
            r#"
            UPDATE attendance_sessions
            SET otp = $2, otp_expires_at = $3
            WHERE id = $1 AND state = 'active'
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(&issued.otp)
        .bind(issued.expires_at)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(session) => Ok(session),
            // Nothing matched: either the session is gone or it has ended.
            None => {
                self.get(session_id).await?;
                Err(DatabaseError::SessionEnded(session_id))
            }
        }
    }

    async fn end(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<Session> {
        sqlx::query_as::<_, Session>(
            r#"
            UPDATE attendance_sessions
            SET state = 'ended',
                otp = NULL,
                otp_expires_at = NULL,
                ended_at = COALESCE(ended_at, $2)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::session_not_found(session_id))
    }

    async fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM attendance_sessions
            WHERE teacher_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(teacher_id.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DatabaseConfig};
    use chrono::Duration;

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_session_lifecycle_against_postgres() {
        let db = Database::new(DatabaseConfig::from_env()).await.unwrap();
        db.migrate().await.unwrap();
        let repo = SessionRepository::new(db.pool().clone());

        let now = Utc::now();
        let session = repo
            .create(
                &NewSession {
                    teacher_id: "teacher-pg".to_string(),
                    subject: "Algorithms".to_string(),
                    section: "A".to_string(),
                    course: "CS301".to_string(),
                },
                now,
            )
            .await
            .unwrap();

        let issued = IssuedOtp {
            otp: "482913".to_string(),
            expires_at: now + Duration::seconds(20),
        };
        repo.set_otp(session.id, &issued).await.unwrap();
        assert!(repo.is_otp_valid(session.id, "482913", now).await.unwrap());

        let ended = repo.end(session.id, now).await.unwrap();
        assert!(ended.otp.is_none());
        assert!(matches!(
            repo.set_otp(session.id, &issued).await,
            Err(DatabaseError::SessionEnded(_))
        ));

        let owned = repo.list_by_teacher(" teacher-pg ").await.unwrap();
        assert!(owned.iter().any(|s| s.id == session.id));
    }
}
