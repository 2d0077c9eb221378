#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use enrollment_ledger::adapters::notify::RecordingNotifier;
use enrollment_ledger::core::{
    Attendance, AttendanceId, Enrollment, EnrollmentId, EnrollmentStatus, FixedClock, OfferingId,
    PackageId, PaymentStatus, ScheduleId, Session, SessionDetail, SessionId, StudentId,
};
use enrollment_ledger::{InMemoryBackend, LedgerApp};
use std::sync::Arc;

pub const TODAY: &str = "2026-10-16";
pub const STUDENT: StudentId = StudentId(3);
pub const ENROLLMENT: EnrollmentId = EnrollmentId(7);
pub const OFFERING: OfferingId = OfferingId(10);

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn enrollment(id: EnrollmentId, student: StudentId, offering: OfferingId) -> Enrollment {
    Enrollment {
        id,
        student_id: student,
        package_id: PackageId(1),
        offering_id: offering,
        start_date: date("2026-09-01"),
        end_date: date("2026-12-15"),
        status: EnrollmentStatus::Active,
        payment_status: PaymentStatus::Paid,
        original_price: 320.0,
        final_price: 300.0,
        discount_applied: 20.0,
        installments: false,
        classes_used: 2,
        classes_remaining: 6,
    }
}

pub fn session(id: i64, offering: OfferingId, on: &str, start_hour: u32) -> SessionDetail {
    SessionDetail {
        session: Session {
            id: SessionId(id),
            schedule_id: ScheduleId(1),
            offering_id: offering,
            date: date(on),
            start_time: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(start_hour + 1, 0, 0).unwrap(),
            capacity: 10,
            seats_occupied: 4,
            cancelled: false,
            cancellation_reason: None,
        },
        style: Some("Bachata".to_string()),
        instructor: Some("Lucía".to_string()),
        room: Some("Studio B".to_string()),
    }
}

pub fn attendance(id: i64, session: i64, on: &str, attended: Option<bool>) -> Attendance {
    Attendance {
        id: AttendanceId(id),
        enrollment_id: ENROLLMENT,
        session_id: SessionId(session),
        session_date: date(on),
        attended,
        active: true,
    }
}

/// Enrollment 7 with three attendances: pending today (#1), absent last week
/// (#2) and present two weeks ago (#3).
pub async fn seeded_backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .insert_enrollment(enrollment(ENROLLMENT, STUDENT, OFFERING))
        .await;

    backend.insert_session(session(100, OFFERING, TODAY, 18)).await;
    backend.insert_session(session(101, OFFERING, "2026-10-09", 18)).await;
    backend.insert_session(session(102, OFFERING, "2026-10-02", 18)).await;

    backend
        .insert_attendance(attendance(1, 100, TODAY, None))
        .await;
    backend
        .insert_attendance(attendance(2, 101, "2026-10-09", Some(false)))
        .await;
    backend
        .insert_attendance(attendance(3, 102, "2026-10-02", Some(true)))
        .await;
    backend
}

pub fn app(backend: Arc<InMemoryBackend>, notifier: RecordingNotifier) -> LedgerApp {
    LedgerApp::with_clock(
        backend,
        Arc::new(notifier),
        Arc::new(FixedClock(date(TODAY))),
        4,
    )
}
