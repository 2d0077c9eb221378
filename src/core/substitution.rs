//! Substitution requests ("permisos"): swapping a pending or missed class for
//! another session of the same offering.
//!
//! A request is created `PENDING`; approval and rejection belong to an
//! administrator outside this crate and are only observed here.

use crate::core::gather::{gather_partial, Enriched};
use crate::core::ledger::AttendanceLedger;
use crate::domain::model::{
    Attendance, AttendanceId, EnrollmentId, NewSubstitutionRequest, RequestStatus, Session,
    SessionId, StudentId, SubstitutionRequest,
};
use crate::domain::ports::{Clock, EnrollmentStore, LedgerEvent, Notifier, SubstitutionStore};
use crate::utils::error::{LedgerError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;

/// Why a candidate session cannot be picked. Each reason is reported on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableReason {
    Full,
    Cancelled,
    SameClass,
    Concluded,
}

impl DisableReason {
    pub fn label(self) -> &'static str {
        match self {
            DisableReason::Full => "no seats left",
            DisableReason::Cancelled => "session cancelled",
            DisableReason::SameClass => "same class as the original",
            DisableReason::Concluded => "session already took place",
        }
    }
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub session: Session,
    pub disabled: BTreeSet<DisableReason>,
}

impl Candidate {
    pub fn evaluate(session: Session, original_session: SessionId, today: NaiveDate) -> Self {
        let mut disabled = BTreeSet::new();
        if session.is_full() {
            disabled.insert(DisableReason::Full);
        }
        if session.cancelled {
            disabled.insert(DisableReason::Cancelled);
        }
        if session.id == original_session {
            disabled.insert(DisableReason::SameClass);
        }
        if session.has_concluded(today) {
            disabled.insert(DisableReason::Concluded);
        }
        Self { session, disabled }
    }

    pub fn is_selectable(&self) -> bool {
        self.disabled.is_empty()
    }

    fn describe_reasons(&self) -> String {
        self.disabled
            .iter()
            .map(|reason| reason.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A request with human-readable summaries of both sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    pub request: SubstitutionRequest,
    pub original: String,
    pub replacement: String,
}

pub struct SubstitutionWorkflow {
    ledger: AttendanceLedger,
    enrollments: Arc<dyn EnrollmentStore>,
    requests: Arc<dyn SubstitutionStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    notifications: Mutex<JoinSet<()>>,
}

impl SubstitutionWorkflow {
    pub fn new(
        ledger: AttendanceLedger,
        enrollments: Arc<dyn EnrollmentStore>,
        requests: Arc<dyn SubstitutionStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            enrollments,
            requests,
            notifier,
            clock,
            notifications: Mutex::new(JoinSet::new()),
        }
    }

    /// Pending and absent attendances, in ledger order.
    pub async fn list_eligible_attendances(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Attendance>> {
        let eligible: Vec<Attendance> = self
            .ledger
            .attendance_for_enrollment(enrollment_id)
            .await?
            .into_iter()
            .filter(Attendance::is_substitutable)
            .collect();
        tracing::debug!(
            "Enrollment {} has {} substitutable attendances",
            enrollment_id,
            eligible.len()
        );
        Ok(eligible)
    }

    /// Sessions of the enrollment's offering on `date`, each tagged with every
    /// reason it cannot replace `original_attendance_id`.
    pub async fn candidate_replacements(
        &self,
        enrollment_id: EnrollmentId,
        original_attendance_id: AttendanceId,
        date: NaiveDate,
    ) -> Result<Vec<Candidate>> {
        let enrollment = self.enrollments.enrollment(enrollment_id).await?;
        let original = self.ledger.attendance_by_id(original_attendance_id).await?;
        if original.enrollment_id != enrollment_id {
            return Err(LedgerError::validation(format!(
                "attendance {} does not belong to enrollment {}",
                original.id, enrollment_id
            )));
        }
        let today = self.clock.today();

        let mut candidates: Vec<Candidate> = self
            .ledger
            .catalog()
            .sessions_on_date(date)
            .await?
            .into_iter()
            .filter(|session| session.offering_id == enrollment.offering_id)
            .map(|session| Candidate::evaluate(session, original.session_id, today))
            .collect();
        candidates.sort_by_key(|c| (c.session.start_time, c.session.id));

        tracing::debug!(
            "{} candidate sessions on {} for enrollment {} ({} selectable)",
            candidates.len(),
            date,
            enrollment_id,
            candidates.iter().filter(|c| c.is_selectable()).count()
        );
        Ok(candidates)
    }

    pub async fn create_request(&self, request: NewSubstitutionRequest) -> Result<SubstitutionRequest> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::input("reason", "a reason is required"));
        }

        let original = self
            .ledger
            .attendance_by_id(request.original_attendance_id)
            .await?;
        if original.enrollment_id != request.enrollment_id {
            return Err(LedgerError::validation(format!(
                "attendance {} does not belong to enrollment {}",
                original.id, request.enrollment_id
            )));
        }
        if !original.active {
            return Err(LedgerError::validation(format!(
                "attendance {} is no longer active",
                original.id
            )));
        }
        if !original.is_substitutable() {
            return Err(LedgerError::validation(format!(
                "attendance {} was already attended and cannot be made up",
                original.id
            )));
        }

        let enrollment = self.enrollments.enrollment(request.enrollment_id).await?;
        if enrollment.student_id != request.student_id {
            return Err(LedgerError::validation(format!(
                "enrollment {} does not belong to student {}",
                enrollment.id, request.student_id
            )));
        }

        let already_pending = self
            .requests
            .requests_for_student(request.student_id)
            .await?
            .iter()
            .any(|existing| {
                existing.active
                    && existing.status == RequestStatus::Pending
                    && existing.original_attendance_id == original.id
            });
        if already_pending {
            return Err(LedgerError::validation(format!(
                "attendance {} already has a pending substitution request",
                original.id
            )));
        }

        let replacement = self
            .ledger
            .catalog()
            .session_detail(request.replacement_session_id)
            .await?;
        if replacement.session.offering_id != enrollment.offering_id {
            return Err(LedgerError::validation(format!(
                "session {} belongs to a different offering",
                replacement.session.id
            )));
        }

        let candidate = Candidate::evaluate(replacement.session, original.session_id, self.clock.today());
        if !candidate.is_selectable() {
            return Err(LedgerError::conflict(format!(
                "session {} cannot be selected: {}",
                candidate.session.id,
                candidate.describe_reasons()
            )));
        }

        let payload = NewSubstitutionRequest {
            reason: reason.to_string(),
            ..request
        };
        let created = self.requests.create_request(payload).await?;
        tracing::info!(
            "Substitution request {} created: attendance {} -> session {}",
            created.id,
            created.original_attendance_id,
            created.replacement_session_id
        );

        self.dispatch(LedgerEvent::SubstitutionRequested {
            request_id: created.id,
            student_id: created.student_id,
            enrollment_id: created.enrollment_id,
            original_attendance_id: created.original_attendance_id,
            replacement_session_id: created.replacement_session_id,
        });

        Ok(created)
    }

    /// Every request of the student, newest first. Summaries that cannot be
    /// resolved fall back to the raw identifier.
    pub async fn list_requests(&self, student_id: StudentId) -> Result<Vec<RequestView>> {
        let mut requests = self.requests.requests_for_student(student_id).await?;
        requests.sort_by(|a, b| {
            b.request_date
                .cmp(&a.request_date)
                .then_with(|| b.id.cmp(&a.id))
        });

        let concurrency = self.ledger.catalog().concurrency();

        let ledger = self.ledger.clone();
        let attendance_ids: Vec<AttendanceId> =
            requests.iter().map(|r| r.original_attendance_id).collect();
        let originals = gather_partial(attendance_ids, concurrency, move |id| {
            let ledger = ledger.clone();
            let id = *id;
            async move {
                let attendance = ledger.attendance_by_id(id).await?;
                let detail = ledger.catalog().session_detail(attendance.session_id).await?;
                Ok::<_, LedgerError>(detail.summary())
            }
        })
        .await;

        let replacement_ids: Vec<SessionId> =
            requests.iter().map(|r| r.replacement_session_id).collect();
        let replacements = self.ledger.catalog().details_for(replacement_ids).await;

        let views = requests
            .into_iter()
            .zip(originals)
            .zip(replacements)
            .map(|((request, original), replacement)| RequestView {
                original: match original.value {
                    Enriched::Fetched(summary) => summary,
                    Enriched::Fallback { .. } => format!("attendance #{}", original.key),
                },
                replacement: match replacement.value {
                    Enriched::Fetched(detail) => detail.summary(),
                    Enriched::Fallback { .. } => format!("session #{}", replacement.key),
                },
                request,
            })
            .collect();
        Ok(views)
    }

    /// Waits up to `timeout` for every notification dispatched so far. Returns
    /// `false` when some were still in flight; those are aborted.
    pub async fn flush_notifications(&self, timeout: Duration) -> bool {
        let mut tasks = {
            let mut guard = self.notification_tasks();
            std::mem::take(&mut *guard)
        };
        if tasks.is_empty() {
            return true;
        }

        tracing::debug!("Waiting for {} notification(s)", tasks.len());
        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!("Notification task did not complete: {}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                "Abandoning {} notification(s) still in flight after {:?}",
                tasks.len(),
                timeout
            );
            return false;
        }
        true
    }

    fn notification_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends the event without holding up the caller. A failure is only logged.
    fn dispatch(&self, event: LedgerEvent) {
        let notifier = Arc::clone(&self.notifier);
        let mut tasks = self.notification_tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = notifier.notify(event).await {
                tracing::warn!("Notification dispatch failed: {}", e);
            }
        });
    }
}
