//! In-process backend with the same contract as the REST service. Used by the
//! test suites and for offline runs.

use crate::domain::model::{
    Attendance, AttendanceId, Enrollment, EnrollmentId, NewSubstitutionRequest, OfferingId,
    RequestId, RequestStatus, Session, SessionDetail, SessionId, StudentId, SubstitutionRequest,
};
use crate::domain::ports::{AttendanceStore, EnrollmentStore, SessionStore, SubstitutionStore};
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
    sessions: BTreeMap<SessionId, SessionDetail>,
    attendances: BTreeMap<AttendanceId, Attendance>,
    requests: BTreeMap<RequestId, SubstitutionRequest>,
    failing_attendances: HashSet<AttendanceId>,
    mutation_delay: Option<Duration>,
    next_request_id: i64,
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_enrollment(&self, enrollment: Enrollment) {
        let mut state = self.state.lock().await;
        state.enrollments.insert(enrollment.id, enrollment);
    }

    pub async fn insert_session(&self, detail: SessionDetail) {
        let mut state = self.state.lock().await;
        state.sessions.insert(detail.session.id, detail);
    }

    pub async fn insert_attendance(&self, attendance: Attendance) {
        let mut state = self.state.lock().await;
        state.attendances.insert(attendance.id, attendance);
    }

    pub async fn session(&self, session_id: SessionId) -> Option<SessionDetail> {
        let state = self.state.lock().await;
        state.sessions.get(&session_id).cloned()
    }

    pub async fn request_count(&self) -> usize {
        let state = self.state.lock().await;
        state.requests.len()
    }

    /// Makes every mutation of `attendance_id` fail as if the backend were unreachable.
    pub async fn fail_mutations_for(&self, attendance_id: AttendanceId) {
        let mut state = self.state.lock().await;
        state.failing_attendances.insert(attendance_id);
    }

    pub async fn restore_mutations_for(&self, attendance_id: AttendanceId) {
        let mut state = self.state.lock().await;
        state.failing_attendances.remove(&attendance_id);
    }

    /// Holds every attendance mutation for `delay` before it is applied.
    pub async fn delay_mutations(&self, delay: Duration) {
        let mut state = self.state.lock().await;
        state.mutation_delay = Some(delay);
    }

    /// Applies an administrator's decision. Terminal requests cannot change, and a
    /// rejection gives the claimed seat back.
    pub async fn resolve_request(
        &self,
        request_id: RequestId,
        status: RequestStatus,
        responder_id: i64,
        rejection_reason: Option<String>,
    ) -> Result<SubstitutionRequest> {
        let mut state = self.state.lock().await;
        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| LedgerError::not_found("substitution request", request_id))?;

        if !request.status.can_transition_to(status) {
            return Err(LedgerError::validation(format!(
                "request {} is {} and cannot become {}",
                request_id,
                request.status.label(),
                status.label()
            )));
        }

        request.status = status;
        request.responder_id = Some(responder_id);
        request.response_date = Some(Utc::now());
        if status == RequestStatus::Rejected {
            request.rejection_reason = rejection_reason;
        }
        let resolved = request.clone();

        if status == RequestStatus::Rejected {
            if let Some(detail) = state.sessions.get_mut(&resolved.replacement_session_id) {
                detail.session.seats_occupied = detail.session.seats_occupied.saturating_sub(1);
            }
        }
        Ok(resolved)
    }

    async fn mutate(&self, attendance_id: AttendanceId, present: bool) -> Result<Attendance> {
        let delay = self.state.lock().await.mutation_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().await;
        if state.failing_attendances.contains(&attendance_id) {
            return Err(LedgerError::transport(format!(
                "connection reset while updating attendance {}",
                attendance_id
            )));
        }
        let attendance = state
            .attendances
            .get_mut(&attendance_id)
            .ok_or_else(|| LedgerError::not_found("attendance", attendance_id))?;
        attendance.attended = Some(present);
        Ok(attendance.clone())
    }
}

#[async_trait]
impl SessionStore for InMemoryBackend {
    async fn sessions_on_date(&self, date: NaiveDate) -> Result<Vec<Session>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .filter(|d| d.session.date == date)
            .map(|d| d.session.clone())
            .collect())
    }

    async fn sessions_for_offering(
        &self,
        offering_id: OfferingId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Session>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .map(|d| &d.session)
            .filter(|s| s.offering_id == offering_id)
            .filter(|s| from.map_or(true, |from| s.date >= from))
            .filter(|s| to.map_or(true, |to| s.date <= to))
            .cloned()
            .collect())
    }

    async fn session_detail(&self, session_id: SessionId) -> Result<SessionDetail> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("session", session_id))
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryBackend {
    async fn enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment> {
        let state = self.state.lock().await;
        state
            .enrollments
            .get(&enrollment_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("enrollment", enrollment_id))
    }
}

#[async_trait]
impl AttendanceStore for InMemoryBackend {
    async fn attendances_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Attendance>> {
        let state = self.state.lock().await;
        Ok(state
            .attendances
            .values()
            .filter(|a| a.enrollment_id == enrollment_id)
            .cloned()
            .collect())
    }

    async fn attendance(&self, attendance_id: AttendanceId) -> Result<Attendance> {
        let state = self.state.lock().await;
        state
            .attendances
            .get(&attendance_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("attendance", attendance_id))
    }

    async fn mark_present(&self, attendance_id: AttendanceId) -> Result<Attendance> {
        self.mutate(attendance_id, true).await
    }

    async fn mark_absent(&self, attendance_id: AttendanceId) -> Result<Attendance> {
        self.mutate(attendance_id, false).await
    }
}

#[async_trait]
impl SubstitutionStore for InMemoryBackend {
    /// Claims a seat on the replacement session under the state lock. A full or
    /// cancelled session rejects the request, and so does a second pending
    /// request for the same attendance.
    async fn create_request(&self, request: NewSubstitutionRequest) -> Result<SubstitutionRequest> {
        let mut state = self.state.lock().await;
        if !state.attendances.contains_key(&request.original_attendance_id) {
            return Err(LedgerError::not_found(
                "attendance",
                request.original_attendance_id,
            ));
        }
        let already_pending = state.requests.values().any(|existing| {
            existing.active
                && existing.status == RequestStatus::Pending
                && existing.original_attendance_id == request.original_attendance_id
        });
        if already_pending {
            return Err(LedgerError::validation(format!(
                "attendance {} already has a pending substitution request",
                request.original_attendance_id
            )));
        }

        let detail = state
            .sessions
            .get_mut(&request.replacement_session_id)
            .ok_or_else(|| LedgerError::not_found("session", request.replacement_session_id))?;
        if detail.session.cancelled {
            return Err(LedgerError::conflict(format!(
                "session {} was cancelled",
                detail.session.id
            )));
        }
        if detail.session.is_full() {
            return Err(LedgerError::conflict(format!(
                "session {} has no seats left",
                detail.session.id
            )));
        }
        detail.session.seats_occupied += 1;

        state.next_request_id += 1;
        let created = SubstitutionRequest {
            id: RequestId(state.next_request_id),
            student_id: request.student_id,
            enrollment_id: request.enrollment_id,
            original_attendance_id: request.original_attendance_id,
            replacement_session_id: request.replacement_session_id,
            reason: request.reason,
            request_date: Utc::now(),
            status: RequestStatus::Pending,
            rejection_reason: None,
            response_date: None,
            responder_id: None,
            active: true,
        };
        state.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn requests_for_student(&self, student_id: StudentId) -> Result<Vec<SubstitutionRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
pub(crate) fn sample_session(id: i64, offering: i64, date: &str) -> SessionDetail {
    use crate::domain::model::ScheduleId;
    use chrono::NaiveTime;

    SessionDetail {
        session: Session {
            id: SessionId(id),
            schedule_id: ScheduleId(1),
            offering_id: OfferingId(offering),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
            capacity: 12,
            seats_occupied: 3,
            cancelled: false,
            cancellation_reason: None,
        },
        style: Some("Salsa".to_string()),
        instructor: Some("Marta".to_string()),
        room: Some("Studio A".to_string()),
    }
}

#[cfg(test)]
pub(crate) fn sample_attendance(
    id: i64,
    enrollment: i64,
    session: i64,
    date: &str,
    attended: Option<bool>,
) -> Attendance {
    Attendance {
        id: AttendanceId(id),
        enrollment_id: EnrollmentId(enrollment),
        session_id: SessionId(session),
        session_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        attended,
        active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_request_claims_last_seat_once() {
        let backend = InMemoryBackend::new();
        let mut detail = sample_session(20, 10, "2026-10-20");
        detail.session.capacity = 4;
        detail.session.seats_occupied = 3;
        backend.insert_session(detail).await;
        backend
            .insert_attendance(sample_attendance(1, 7, 100, "2026-10-09", Some(false)))
            .await;
        backend
            .insert_attendance(sample_attendance(2, 7, 101, "2026-10-02", Some(false)))
            .await;

        let payload = NewSubstitutionRequest {
            student_id: StudentId(3),
            enrollment_id: EnrollmentId(7),
            original_attendance_id: AttendanceId(1),
            replacement_session_id: SessionId(20),
            reason: "work trip".to_string(),
        };

        let first = backend.create_request(payload.clone()).await.unwrap();
        assert_eq!(first.status, RequestStatus::Pending);
        let second = backend
            .create_request(NewSubstitutionRequest {
                original_attendance_id: AttendanceId(2),
                ..payload
            })
            .await;
        assert!(matches!(second, Err(LedgerError::ConflictError { .. })));
        assert_eq!(backend.session(SessionId(20)).await.unwrap().session.seats_occupied, 4);
    }

    #[tokio::test]
    async fn test_resolve_request_is_terminal() {
        let backend = InMemoryBackend::new();
        backend.insert_session(sample_session(20, 10, "2026-10-20")).await;
        backend
            .insert_attendance(sample_attendance(1, 7, 100, "2026-10-09", None))
            .await;
        let created = backend
            .create_request(NewSubstitutionRequest {
                student_id: StudentId(3),
                enrollment_id: EnrollmentId(7),
                original_attendance_id: AttendanceId(1),
                replacement_session_id: SessionId(20),
                reason: "sick".to_string(),
            })
            .await
            .unwrap();

        let rejected = backend
            .resolve_request(created.id, RequestStatus::Rejected, 1, Some("full".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(backend.session(SessionId(20)).await.unwrap().session.seats_occupied, 3);

        let again = backend
            .resolve_request(created.id, RequestStatus::Approved, 1, None)
            .await;
        assert!(matches!(again, Err(LedgerError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_leave_one_pending_request() {
        let backend = InMemoryBackend::new();
        backend.insert_session(sample_session(20, 10, "2026-10-20")).await;
        backend.insert_session(sample_session(21, 10, "2026-10-21")).await;
        backend
            .insert_attendance(sample_attendance(1, 7, 100, "2026-10-09", Some(false)))
            .await;
        let payload = |session: i64| NewSubstitutionRequest {
            student_id: StudentId(3),
            enrollment_id: EnrollmentId(7),
            original_attendance_id: AttendanceId(1),
            replacement_session_id: SessionId(session),
            reason: "work trip".to_string(),
        };

        let (first, second) = tokio::join!(
            backend.create_request(payload(20)),
            backend.create_request(payload(21)),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(LedgerError::ValidationError { .. }))));
        assert_eq!(backend.request_count().await, 1);
        let mut claimed = 0;
        for id in [20, 21].map(SessionId) {
            claimed += backend.session(id).await.unwrap().session.seats_occupied - 3;
        }
        assert_eq!(claimed, 1);
    }
}
