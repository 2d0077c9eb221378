use crate::core::gather::gather_all;
use crate::core::ledger::AttendanceLedger;
use crate::domain::model::{Attendance, AttendanceId, AttendanceState, EnrollmentId};
use crate::utils::error::{LedgerError, Result};
use std::collections::BTreeMap;

/// Uncommitted attendance changes on top of the stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceDraft {
    stored: BTreeMap<AttendanceId, Option<bool>>,
    proposed: BTreeMap<AttendanceId, bool>,
}

impl AttendanceDraft {
    pub fn from_attendances(attendances: &[Attendance]) -> Self {
        Self {
            stored: attendances.iter().map(|a| (a.id, a.attended)).collect(),
            proposed: BTreeMap::new(),
        }
    }

    fn stored(&self, id: AttendanceId) -> Result<Option<bool>> {
        self.stored
            .get(&id)
            .copied()
            .ok_or_else(|| LedgerError::not_found("attendance", id))
    }

    /// Stored value overlaid with the proposal, if any.
    pub fn effective(&self, id: AttendanceId) -> Result<AttendanceState> {
        let stored = self.stored(id)?;
        let attended = self.proposed.get(&id).copied().map(Some).unwrap_or(stored);
        Ok(AttendanceState::from_attended(attended))
    }

    /// Flips the effective value (pending reads as not present) and returns the
    /// new one. Toggling back to the stored value drops the proposal, so a
    /// pending class toggled twice stays pending.
    pub fn toggle(&mut self, id: AttendanceId) -> Result<AttendanceState> {
        let present = self.effective(id)? != AttendanceState::Present;
        if !present && self.stored(id)?.is_none() {
            self.proposed.remove(&id);
            return self.effective(id);
        }
        self.set(id, present)
    }

    /// Proposes an explicit value; this is how a pending class is marked absent.
    pub fn set(&mut self, id: AttendanceId, present: bool) -> Result<AttendanceState> {
        if self.stored(id)? == Some(present) {
            self.proposed.remove(&id);
        } else {
            self.proposed.insert(id, present);
        }
        self.effective(id)
    }

    pub fn pending(&self) -> impl Iterator<Item = (AttendanceId, bool)> + '_ {
        self.proposed.iter().map(|(id, present)| (*id, *present))
    }

    pub fn pending_count(&self) -> usize {
        self.proposed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.proposed.is_empty()
    }

    /// Re-proposes every mutation that failed in `report`.
    pub fn restage(&mut self, report: &CommitReport) {
        for outcome in report.outcomes.iter().filter(|o| o.result.is_err()) {
            self.proposed.insert(outcome.attendance_id, outcome.present);
        }
    }

    fn clear_pending(&mut self) {
        self.proposed.clear();
    }

    fn record(&mut self, attendance: &Attendance) {
        self.stored.insert(attendance.id, attendance.attended);
    }
}

#[derive(Debug)]
pub struct MutationOutcome {
    pub attendance_id: AttendanceId,
    pub present: bool,
    pub result: Result<Attendance>,
}

#[derive(Debug, Default)]
pub struct CommitReport {
    pub outcomes: Vec<MutationOutcome>,
}

impl CommitReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failed_ids(&self) -> Vec<AttendanceId> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.attendance_id)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    /// Turns a partial commit into a transport error naming the failed ids.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let ids = self
            .failed_ids()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(LedgerError::transport(format!(
            "{} of {} attendance change(s) failed: {}",
            self.failed(),
            self.outcomes.len(),
            ids
        )))
    }
}

/// Buffers attendance toggles for one enrollment and commits them as
/// independent mutations.
pub struct AttendanceBatchCommitter {
    ledger: AttendanceLedger,
    draft: AttendanceDraft,
}

impl AttendanceBatchCommitter {
    pub fn new(ledger: AttendanceLedger) -> Self {
        Self {
            ledger,
            draft: AttendanceDraft::default(),
        }
    }

    /// Loads the stored values of an enrollment, discarding any proposals.
    pub async fn load(&mut self, enrollment_id: EnrollmentId) -> Result<Vec<Attendance>> {
        let attendances = self.ledger.attendance_for_enrollment(enrollment_id).await?;
        self.draft = AttendanceDraft::from_attendances(&attendances);
        Ok(attendances)
    }

    pub fn draft(&self) -> &AttendanceDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut AttendanceDraft {
        &mut self.draft
    }

    pub fn toggle(&mut self, id: AttendanceId) -> Result<AttendanceState> {
        self.draft.toggle(id)
    }

    pub fn set(&mut self, id: AttendanceId, present: bool) -> Result<AttendanceState> {
        self.draft.set(id, present)
    }

    /// Issues every pending mutation concurrently and clears the draft. No
    /// transaction spans them: each outcome is reported on its own.
    ///
    /// The draft is only cleared once every mutation has reported. If the
    /// returned future is dropped first, the in-flight mutations are aborted and
    /// every proposal stays staged; marking is idempotent, so committing again
    /// re-sends the ones that had already landed.
    pub async fn commit(&mut self) -> CommitReport {
        let pending: Vec<(AttendanceId, bool)> = self.draft.pending().collect();
        if pending.is_empty() {
            return CommitReport::default();
        }

        let ledger = self.ledger.clone();
        let concurrency = ledger.catalog().concurrency();
        let results = gather_all(pending, concurrency, move |(id, present)| {
            let ledger = ledger.clone();
            let (id, present) = (*id, *present);
            async move { ledger.mark(id, present).await }
        })
        .await;

        self.draft.clear_pending();
        let mut report = CommitReport::default();
        for ((attendance_id, present), result) in results {
            match &result {
                Ok(attendance) => self.draft.record(attendance),
                Err(e) => tracing::warn!(
                    "Marking attendance {} as {} failed: {}",
                    attendance_id,
                    if present { "present" } else { "absent" },
                    e
                ),
            }
            report.outcomes.push(MutationOutcome {
                attendance_id,
                present,
                result,
            });
        }

        tracing::info!(
            "Attendance commit: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::sample_attendance;

    fn draft() -> AttendanceDraft {
        AttendanceDraft::from_attendances(&[
            sample_attendance(1, 7, 100, "2026-10-16", None),
            sample_attendance(2, 7, 101, "2026-10-09", Some(false)),
            sample_attendance(3, 7, 102, "2026-10-02", Some(true)),
        ])
    }

    #[test]
    fn test_toggle_twice_restores_effective_value() {
        let mut draft = draft();
        for id in [1, 2, 3].map(AttendanceId) {
            let before = draft.effective(id).unwrap();
            draft.toggle(id).unwrap();
            draft.toggle(id).unwrap();
            assert_eq!(draft.effective(id).unwrap(), before);
        }
        assert!(draft.is_clean());
    }

    #[test]
    fn test_toggle_flips_effective_value() {
        let mut draft = draft();
        assert_eq!(draft.toggle(AttendanceId(1)).unwrap(), AttendanceState::Present);
        assert_eq!(draft.toggle(AttendanceId(2)).unwrap(), AttendanceState::Present);
        assert_eq!(draft.toggle(AttendanceId(3)).unwrap(), AttendanceState::Absent);
        assert_eq!(draft.pending_count(), 3);
    }

    #[test]
    fn test_set_marks_pending_absent() {
        let mut draft = draft();
        assert_eq!(draft.set(AttendanceId(1), false).unwrap(), AttendanceState::Absent);
        assert_eq!(draft.pending().collect::<Vec<_>>(), vec![(AttendanceId(1), false)]);

        assert_eq!(draft.set(AttendanceId(2), false).unwrap(), AttendanceState::Absent);
        assert_eq!(draft.pending_count(), 1);
    }

    #[test]
    fn test_ensure_complete_reports_failed_ids() {
        let report = CommitReport {
            outcomes: vec![
                MutationOutcome {
                    attendance_id: AttendanceId(1),
                    present: true,
                    result: Ok(sample_attendance(1, 7, 100, "2026-10-16", Some(true))),
                },
                MutationOutcome {
                    attendance_id: AttendanceId(2),
                    present: true,
                    result: Err(LedgerError::transport("connection reset")),
                },
            ],
        };

        let err = report.ensure_complete().unwrap_err();
        assert!(matches!(err, LedgerError::TransportError { ref message } if message == "1 of 2 attendance change(s) failed: 2"));
        assert_eq!(err.severity(), crate::utils::error::ErrorSeverity::Medium);
        assert!(CommitReport::default().ensure_complete().is_ok());
    }

    #[test]
    fn test_unknown_attendance_is_not_found() {
        let mut draft = draft();
        assert!(matches!(
            draft.toggle(AttendanceId(99)),
            Err(LedgerError::NotFoundError { .. })
        ));
    }
}
