use crate::domain::model::{
    Attendance, AttendanceId, Enrollment, EnrollmentId, NewSubstitutionRequest, OfferingId,
    RequestId, Session, SessionDetail, SessionId, StudentId, SubstitutionRequest,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn auth_token(&self) -> Option<&str>;
    fn concurrent_requests(&self) -> usize;
    fn request_timeout_seconds(&self) -> u64;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn sessions_on_date(&self, date: NaiveDate) -> Result<Vec<Session>>;
    async fn sessions_for_offering(
        &self,
        offering_id: OfferingId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Session>>;
    async fn session_detail(&self, session_id: SessionId) -> Result<SessionDetail>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn attendances_for_enrollment(&self, enrollment_id: EnrollmentId)
        -> Result<Vec<Attendance>>;
    async fn attendance(&self, attendance_id: AttendanceId) -> Result<Attendance>;
    async fn mark_present(&self, attendance_id: AttendanceId) -> Result<Attendance>;
    async fn mark_absent(&self, attendance_id: AttendanceId) -> Result<Attendance>;
}

/// Persistence of substitution requests. `create_request` must claim a seat on the
/// replacement session atomically and fail with a conflict when none is left.
/// It must also reject, with a validation error, a second pending request for the
/// same attendance; a check made by the caller beforehand can race.
#[async_trait]
pub trait SubstitutionStore: Send + Sync {
    async fn create_request(&self, request: NewSubstitutionRequest) -> Result<SubstitutionRequest>;
    async fn requests_for_student(&self, student_id: StudentId)
        -> Result<Vec<SubstitutionRequest>>;
}

/// Events pushed to the notification dispatcher after a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    SubstitutionRequested {
        request_id: RequestId,
        student_id: StudentId,
        enrollment_id: EnrollmentId,
        original_attendance_id: AttendanceId,
        replacement_session_id: SessionId,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: LedgerEvent) -> Result<()>;
}

pub trait IdentityProvider: Send + Sync {
    fn current_student(&self) -> Option<StudentId>;
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
