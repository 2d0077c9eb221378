pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::LedgerConfig;

pub use adapters::{http::HttpBackend, memory::InMemoryBackend};
pub use app::LedgerApp;
pub use core::{
    batch::{AttendanceBatchCommitter, AttendanceDraft, CommitReport},
    catalog::SessionCatalog,
    installments::{allocate, InstallmentPlan, InstallmentPolicy},
    ledger::AttendanceLedger,
    substitution::{Candidate, DisableReason, SubstitutionWorkflow},
};
pub use utils::error::{LedgerError, Result};
