use crate::core::catalog::SessionCatalog;
use crate::core::gather::Enriched;
use crate::domain::model::{
    Attendance, AttendanceId, AttendanceState, DisplayStatus, EnrollmentId, SessionDetail,
};
use crate::domain::ports::AttendanceStore;
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub attended: usize,
    pub absent: usize,
    pub pending: usize,
}

impl AttendanceSummary {
    pub fn from_attendances(attendances: &[Attendance]) -> Self {
        let total = attendances.len();
        let attended = attendances
            .iter()
            .filter(|a| a.state() == AttendanceState::Present)
            .count();
        let absent = attendances
            .iter()
            .filter(|a| a.state() == AttendanceState::Absent)
            .count();
        Self {
            total,
            attended,
            absent,
            pending: total - attended - absent,
        }
    }
}

/// One ledger row with its best-effort session detail.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub attendance: Attendance,
    pub session: Enriched<SessionDetail>,
}

impl LedgerEntry {
    pub fn display_status(&self) -> DisplayStatus {
        let cancelled = self
            .session
            .as_fetched()
            .map(|detail| detail.session.cancelled)
            .unwrap_or(false);
        DisplayStatus::resolve(self.attendance.state(), cancelled)
    }

    pub fn session_label(&self) -> String {
        match &self.session {
            Enriched::Fetched(detail) => detail.summary(),
            Enriched::Fallback { .. } => format!(
                "{} (session #{})",
                self.attendance.session_date, self.attendance.session_id
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrollmentLedger {
    pub enrollment_id: EnrollmentId,
    pub entries: Vec<LedgerEntry>,
    pub summary: AttendanceSummary,
}

/// Tri-state attendance records per enrollment.
#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn AttendanceStore>,
    catalog: SessionCatalog,
}

impl AttendanceLedger {
    pub fn new(store: Arc<dyn AttendanceStore>, catalog: SessionCatalog) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &SessionCatalog {
        &self.catalog
    }

    /// Active attendances, most recent session first.
    pub async fn attendance_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Attendance>> {
        let mut attendances: Vec<Attendance> = self
            .store
            .attendances_for_enrollment(enrollment_id)
            .await?
            .into_iter()
            .filter(|a| a.active)
            .collect();
        attendances.sort_by(|a, b| {
            b.session_date
                .cmp(&a.session_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        tracing::debug!(
            "Enrollment {} has {} active attendances",
            enrollment_id,
            attendances.len()
        );
        Ok(attendances)
    }

    pub async fn attendance_by_id(&self, attendance_id: AttendanceId) -> Result<Attendance> {
        self.store.attendance(attendance_id).await
    }

    pub async fn summary(&self, enrollment_id: EnrollmentId) -> Result<AttendanceSummary> {
        let attendances = self.attendance_for_enrollment(enrollment_id).await?;
        Ok(AttendanceSummary::from_attendances(&attendances))
    }

    /// Ordered attendances with session details attached. Missing details
    /// degrade the row's label and never fail the load.
    pub async fn ledger_for_enrollment(&self, enrollment_id: EnrollmentId) -> Result<EnrollmentLedger> {
        let attendances = self.attendance_for_enrollment(enrollment_id).await?;
        let summary = AttendanceSummary::from_attendances(&attendances);

        let session_ids = attendances.iter().map(|a| a.session_id).collect();
        let details = self.catalog.details_for(session_ids).await;

        let entries = attendances
            .into_iter()
            .zip(details)
            .map(|(attendance, gathered)| LedgerEntry {
                attendance,
                session: gathered.value,
            })
            .collect();

        Ok(EnrollmentLedger {
            enrollment_id,
            entries,
            summary,
        })
    }

    /// Records the attendance as present or absent. Nothing returns it to pending.
    pub async fn mark(&self, attendance_id: AttendanceId, present: bool) -> Result<Attendance> {
        if present {
            self.store.mark_present(attendance_id).await
        } else {
            self.store.mark_absent(attendance_id).await
        }
    }
}
