use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i64> for $name {
                fn from(value: i64) -> Self {
                    Self(value)
                }
            }
        )+
    };
}

id_type!(
    StudentId,
    EnrollmentId,
    PackageId,
    OfferingId,
    ScheduleId,
    SessionId,
    AttendanceId,
    RequestId,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

/// A student's purchased package inside one offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub package_id: PackageId,
    pub offering_id: OfferingId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: EnrollmentStatus,
    pub payment_status: PaymentStatus,
    pub original_price: f64,
    pub final_price: f64,
    #[serde(default)]
    pub discount_applied: f64,
    #[serde(default)]
    pub installments: bool,
    #[serde(default)]
    pub classes_used: u32,
    #[serde(default)]
    pub classes_remaining: u32,
}

/// One dated occurrence of a schedule slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub schedule_id: ScheduleId,
    pub offering_id: OfferingId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub seats_occupied: u32,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

impl Session {
    pub fn is_full(&self) -> bool {
        self.seats_occupied >= self.capacity
    }

    pub fn has_concluded(&self, today: NaiveDate) -> bool {
        self.date < today
    }

    pub fn seats_left(&self) -> u32 {
        self.capacity.saturating_sub(self.seats_occupied)
    }
}

/// Session plus the denormalized display fields the detail endpoint returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}

impl SessionDetail {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} {}-{}",
            self.session.date,
            self.session.start_time.format("%H:%M"),
            self.session.end_time.format("%H:%M")
        );
        if let Some(style) = &self.style {
            summary.push(' ');
            summary.push_str(style);
        }
        summary
    }
}

/// Exhaustive tri-state of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
    Pending,
    Present,
    Absent,
}

impl AttendanceState {
    pub fn from_attended(attended: Option<bool>) -> Self {
        match attended {
            None => AttendanceState::Pending,
            Some(true) => AttendanceState::Present,
            Some(false) => AttendanceState::Absent,
        }
    }

    pub fn attended(self) -> Option<bool> {
        match self {
            AttendanceState::Pending => None,
            AttendanceState::Present => Some(true),
            AttendanceState::Absent => Some(false),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceState::Pending => "pending",
            AttendanceState::Present => "present",
            AttendanceState::Absent => "absent",
        }
    }
}

/// What a ledger row shows: the tri-state, unless the session was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Pending,
    Present,
    Absent,
    Cancelled,
}

impl DisplayStatus {
    pub fn resolve(state: AttendanceState, session_cancelled: bool) -> Self {
        if session_cancelled {
            return DisplayStatus::Cancelled;
        }
        match state {
            AttendanceState::Pending => DisplayStatus::Pending,
            AttendanceState::Present => DisplayStatus::Present,
            AttendanceState::Absent => DisplayStatus::Absent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayStatus::Pending => "pending",
            DisplayStatus::Present => "present",
            DisplayStatus::Absent => "absent",
            DisplayStatus::Cancelled => "cancelled",
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: AttendanceId,
    pub enrollment_id: EnrollmentId,
    pub session_id: SessionId,
    pub session_date: NaiveDate,
    pub attended: Option<bool>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Attendance {
    pub fn state(&self) -> AttendanceState {
        AttendanceState::from_attended(self.attended)
    }

    /// Present classes cannot be made up; pending and absent ones can.
    pub fn is_substitutable(&self) -> bool {
        self.active && self.state() != AttendanceState::Present
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// A "permiso": count `replacement_session_id` in place of the original attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRequest {
    pub id: RequestId,
    pub student_id: StudentId,
    pub enrollment_id: EnrollmentId,
    pub original_attendance_id: AttendanceId,
    pub replacement_session_id: SessionId,
    pub reason: String,
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub response_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responder_id: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubstitutionRequest {
    pub student_id: StudentId,
    pub enrollment_id: EnrollmentId,
    pub original_attendance_id: AttendanceId,
    pub replacement_session_id: SessionId,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_state_round_trips_tri_state() {
        for attended in [None, Some(true), Some(false)] {
            assert_eq!(AttendanceState::from_attended(attended).attended(), attended);
        }
    }

    #[test]
    fn test_cancelled_session_overrides_display() {
        assert_eq!(
            DisplayStatus::resolve(AttendanceState::Present, true),
            DisplayStatus::Cancelled
        );
        assert_eq!(
            DisplayStatus::resolve(AttendanceState::Absent, false),
            DisplayStatus::Absent
        );
    }

    #[test]
    fn test_request_status_terminals_are_immutable() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Approved));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Rejected.can_transition_to(RequestStatus::Pending));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Pending));
    }

    #[test]
    fn test_session_detail_deserializes_flattened() {
        let detail: SessionDetail = serde_json::from_value(serde_json::json!({
            "id": 9,
            "schedule_id": 2,
            "offering_id": 4,
            "date": "2026-10-20",
            "start_time": "18:00:00",
            "end_time": "19:30:00",
            "capacity": 12,
            "seats_occupied": 12,
            "style": "Salsa"
        }))
        .unwrap();

        assert!(detail.session.is_full());
        assert!(!detail.session.cancelled);
        assert_eq!(detail.summary(), "2026-10-20 18:00-19:30 Salsa");
    }
}
