use crate::core::batch::AttendanceBatchCommitter;
use crate::core::catalog::SessionCatalog;
use crate::core::ledger::AttendanceLedger;
use crate::core::substitution::SubstitutionWorkflow;
use crate::domain::ports::{
    AttendanceStore, Clock, EnrollmentStore, Notifier, SessionStore, SubstitutionStore,
    SystemClock,
};
use std::sync::Arc;

/// Wires the ledger components on top of one backend.
pub struct LedgerApp {
    ledger: AttendanceLedger,
    workflow: Arc<SubstitutionWorkflow>,
}

impl LedgerApp {
    pub fn new<B>(backend: Arc<B>, notifier: Arc<dyn Notifier>, concurrency: usize) -> Self
    where
        B: SessionStore + EnrollmentStore + AttendanceStore + SubstitutionStore + 'static,
    {
        Self::with_clock(backend, notifier, Arc::new(SystemClock), concurrency)
    }

    pub fn with_clock<B>(
        backend: Arc<B>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        concurrency: usize,
    ) -> Self
    where
        B: SessionStore + EnrollmentStore + AttendanceStore + SubstitutionStore + 'static,
    {
        let catalog = SessionCatalog::new(backend.clone(), concurrency);
        let ledger = AttendanceLedger::new(backend.clone(), catalog);
        let workflow = SubstitutionWorkflow::new(
            ledger.clone(),
            backend.clone(),
            backend,
            notifier,
            clock,
        );
        Self {
            ledger,
            workflow: Arc::new(workflow),
        }
    }

    pub fn catalog(&self) -> &SessionCatalog {
        self.ledger.catalog()
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    pub fn workflow(&self) -> Arc<SubstitutionWorkflow> {
        Arc::clone(&self.workflow)
    }

    /// A fresh committer with an empty draft.
    pub fn committer(&self) -> AttendanceBatchCommitter {
        AttendanceBatchCommitter::new(self.ledger.clone())
    }
}
