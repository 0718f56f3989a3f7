//! In-process stores for single-node deployments and tests.
//!
//! Locking is per session: the outer map lock is only held long enough to
//! find (or insert) a session's slot, and every mutation happens under that
//! slot's own mutex. Sessions never contend with each other.

use crate::error::{DatabaseError, Result};
use crate::store::{AttendanceLedger, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_models::{AttendanceRecord, IssuedOtp, NewSession, Session, StudentIdentity};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use validator::Validate;

type SessionSlot = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, session_id: Uuid) -> Result<SessionSlot> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| DatabaseError::session_not_found(session_id))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, new_session: &NewSession, created_at: DateTime<Utc>) -> Result<Session> {
        new_session.validate()?;
        let session = Session::new(Uuid::new_v4(), new_session, created_at);

        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session.clone())));

        Ok(session)
    }

    async fn get(&self, session_id: Uuid) -> Result<Session> {
        let slot = self.slot(session_id).await?;
        let session = slot.lock().await.clone();
        Ok(session)
    }

    async fn set_otp(&self, session_id: Uuid, issued: &IssuedOtp) -> Result<Session> {
        let slot = self.slot(session_id).await?;
        let mut session = slot.lock().await;

        if !session.issue_otp(issued) {
            return Err(DatabaseError::SessionEnded(session_id));
        }
        Ok(session.clone())
    }

    async fn end(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<Session> {
        let slot = self.slot(session_id).await?;
        let mut session = slot.lock().await;
        session.end(at);
        Ok(session.clone())
    }

    async fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<Session>> {
        let slots: Vec<SessionSlot> = self.sessions.read().await.values().cloned().collect();

        let mut owned = Vec::new();
        for slot in slots {
            let session = slot.lock().await;
            if session.teacher_id == teacher_id.trim() {
                owned.push(session.clone());
            }
        }

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn is_otp_valid(&self, session_id: Uuid, code: &str, at: DateTime<Utc>) -> Result<bool> {
        let slot = self.slot(session_id).await?;
        let session = slot.lock().await;
        Ok(session.accepts_otp(code, at))
    }
}

type LedgerSlot = Arc<Mutex<HashMap<String, AttendanceRecord>>>;

#[derive(Default)]
pub struct MemoryAttendanceLedger {
    sessions: RwLock<HashMap<Uuid, LedgerSlot>>,
}

impl MemoryAttendanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    async fn existing_slot(&self, session_id: Uuid) -> Option<LedgerSlot> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    async fn slot_or_insert(&self, session_id: Uuid) -> LedgerSlot {
        if let Some(slot) = self.existing_slot(session_id).await {
            return slot;
        }
        self.sessions
            .write()
            .await
            .entry(session_id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl AttendanceLedger for MemoryAttendanceLedger {
    async fn record_scan(
        &self,
        session_id: Uuid,
        student: &StudentIdentity,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        student.validate()?;
        let slot = self.slot_or_insert(session_id).await;
        let mut records = slot.lock().await;

        let record = records
            .entry(student.student_id.trim().to_string())
            .or_insert_with(|| AttendanceRecord::new(session_id, student, at));
        Ok(record.clone())
    }

    async fn get(&self, session_id: Uuid, student_id: &str) -> Result<Option<AttendanceRecord>> {
        let Some(slot) = self.existing_slot(session_id).await else {
            return Ok(None);
        };
        let records = slot.lock().await;
        Ok(records.get(student_id.trim()).cloned())
    }

    async fn mark_verified(
        &self,
        session_id: Uuid,
        student_id: &str,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let slot = self
            .existing_slot(session_id)
            .await
            .ok_or_else(|| DatabaseError::record_not_found(session_id, student_id))?;
        let mut records = slot.lock().await;

        let record = records
            .get_mut(student_id.trim())
            .ok_or_else(|| DatabaseError::record_not_found(session_id, student_id))?;
        record.mark_verified(at);
        Ok(record.clone())
    }

    async fn list_by_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let Some(slot) = self.existing_slot(session_id).await else {
            return Ok(Vec::new());
        };

        let mut records: Vec<AttendanceRecord> = slot.lock().await.values().cloned().collect();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap()
    }

    fn new_session(teacher_id: &str) -> NewSession {
        NewSession {
            teacher_id: teacher_id.to_string(),
            subject: "Algorithms".to_string(),
            section: "A".to_string(),
            course: "CS301".to_string(),
        }
    }

    fn student(id: &str) -> StudentIdentity {
        StudentIdentity {
            student_id: id.to_string(),
            student_name: format!("Student {}", id),
            roll_number: format!("R-{}", id),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields() {
        let store = MemorySessionStore::new();
        let mut input = new_session("t-1");
        input.course = "   ".to_string();

        let result = store.create(&input, t0()).await;
        assert!(matches!(result, Err(DatabaseError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_not_found() {
        let store = MemorySessionStore::new();
        let result = store.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DatabaseError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_otp_after_end_fails() {
        let store = MemorySessionStore::new();
        let session = store.create(&new_session("t-1"), t0()).await.unwrap();
        store.end(session.id, t0()).await.unwrap();

        let issued = IssuedOtp {
            otp: "123456".to_string(),
            expires_at: t0() + Duration::seconds(20),
        };
        let result = store.set_otp(session.id, &issued).await;
        assert!(matches!(result, Err(DatabaseError::SessionEnded(id)) if id == session.id));
    }

    #[tokio::test]
    async fn test_end_is_idempotent() {
        let store = MemorySessionStore::new();
        let session = store.create(&new_session("t-1"), t0()).await.unwrap();

        let first = store.end(session.id, t0() + Duration::seconds(1)).await.unwrap();
        let second = store.end(session.id, t0() + Duration::seconds(2)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.ended_at, Some(t0() + Duration::seconds(1)));
    }

    #[tokio::test]
    async fn test_list_by_teacher_newest_first() {
        let store = MemorySessionStore::new();
        let older = store.create(&new_session("t-1"), t0()).await.unwrap();
        let newer = store
            .create(&new_session("t-1"), t0() + Duration::minutes(50))
            .await
            .unwrap();
        store.create(&new_session("t-2"), t0()).await.unwrap();

        let sessions = store.list_by_teacher("t-1").await.unwrap();
        let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        let padded = store.list_by_teacher("  t-1 ").await.unwrap();
        assert_eq!(padded.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_otp_pair_is_never_torn() {
        let store = Arc::new(MemorySessionStore::new());
        let session_id = store.create(&new_session("t-1"), t0()).await.unwrap().id;

        let mut handles = Vec::new();
        for i in 0..50i64 {
            let writer = store.clone();
            handles.push(tokio::spawn(async move {
                let issued = IssuedOtp {
                    otp: format!("{:06}", i),
                    expires_at: t0() + Duration::seconds(i),
                };
                writer.set_otp(session_id, &issued).await.unwrap();
            }));

            let reader = store.clone();
            handles.push(tokio::spawn(async move {
                let seen = reader.get(session_id).await.unwrap();
                match seen.current_otp() {
                    Some((code, expires_at)) => {
                        let offset = (expires_at - t0()).num_seconds();
                        assert_eq!(code, format!("{:06}", offset));
                    }
                    None => assert!(seen.otp.is_none() && seen.otp_expires_at.is_none()),
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scans_create_one_record() {
        let ledger = Arc::new(MemoryAttendanceLedger::new());
        let session_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..32i64 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .record_scan(session_id, &student("stu1"), t0() + Duration::seconds(i))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let records = ledger.list_by_session(session_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_rescan_keeps_original_record() {
        let ledger = MemoryAttendanceLedger::new();
        let session_id = Uuid::new_v4();

        let first = ledger.record_scan(session_id, &student("stu1"), t0()).await.unwrap();
        let mut renamed = student("stu1");
        renamed.student_name = "Someone Else".to_string();
        let second = ledger
            .record_scan(session_id, &renamed, t0() + Duration::seconds(30))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.timestamp, t0());
    }

    #[tokio::test]
    async fn test_mark_verified_requires_scan_and_is_idempotent() {
        let ledger = MemoryAttendanceLedger::new();
        let session_id = Uuid::new_v4();

        let missing = ledger.mark_verified(session_id, "stu1", t0()).await;
        assert!(matches!(missing, Err(DatabaseError::RecordNotFound { .. })));

        ledger.record_scan(session_id, &student("stu1"), t0()).await.unwrap();
        let first = ledger
            .mark_verified(session_id, "stu1", t0() + Duration::seconds(2))
            .await
            .unwrap();
        let second = ledger
            .mark_verified(session_id, "stu1", t0() + Duration::seconds(7))
            .await
            .unwrap();

        assert!(first.verified);
        assert_eq!(first, second);
        assert_eq!(second.verified_at, Some(t0() + Duration::seconds(2)));
    }

    #[tokio::test]
    async fn test_list_orders_by_scan_time() {
        let ledger = MemoryAttendanceLedger::new();
        let session_id = Uuid::new_v4();

        ledger
            .record_scan(session_id, &student("late"), t0() + Duration::seconds(9))
            .await
            .unwrap();
        ledger.record_scan(session_id, &student("early"), t0()).await.unwrap();
        ledger
            .record_scan(session_id, &student("middle"), t0() + Duration::seconds(4))
            .await
            .unwrap();
        ledger
            .record_scan(Uuid::new_v4(), &student("elsewhere"), t0())
            .await
            .unwrap();

        let order: Vec<String> = ledger
            .list_by_session(session_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.student_id)
            .collect();
        assert_eq!(order, vec!["early", "middle", "late"]);
    }
}
