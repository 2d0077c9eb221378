use crate::core::ledger::EnrollmentLedger;
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    attendance_id: i64,
    session_id: i64,
    date: String,
    session: String,
    status: &'a str,
}

/// Writes one CSV row per ledger entry, in ledger order.
pub fn write_ledger_csv<W: Write>(ledger: &EnrollmentLedger, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in &ledger.entries {
        csv_writer.serialize(LedgerRow {
            attendance_id: entry.attendance.id.0,
            session_id: entry.attendance.session_id.0,
            date: entry.attendance.session_date.to_string(),
            session: entry.session_label(),
            status: entry.display_status().label(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gather::Enriched;
    use crate::core::ledger::{AttendanceSummary, LedgerEntry};
    use crate::adapters::memory::{sample_attendance, sample_session};
    use crate::domain::model::EnrollmentId;

    #[test]
    fn test_csv_rows_follow_ledger_order() {
        let entries = vec![
            LedgerEntry {
                attendance: sample_attendance(2, 7, 101, "2026-10-09", Some(false)),
                session: Enriched::Fetched(sample_session(101, 10, "2026-10-09")),
            },
            LedgerEntry {
                attendance: sample_attendance(1, 7, 100, "2026-10-02", None),
                session: Enriched::Fallback {
                    reason: "session 100 not found".to_string(),
                },
            },
        ];
        let attendances: Vec<_> = entries.iter().map(|e| e.attendance.clone()).collect();
        let ledger = EnrollmentLedger {
            enrollment_id: EnrollmentId(7),
            summary: AttendanceSummary::from_attendances(&attendances),
            entries,
        };

        let mut buffer = Vec::new();
        write_ledger_csv(&ledger, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "attendance_id,session_id,date,session,status");
        assert_eq!(lines[1], "2,101,2026-10-09,2026-10-09 18:00-19:30 Salsa,absent");
        assert_eq!(lines[2], "1,100,2026-10-02,2026-10-02 (session #100),pending");
    }
}
