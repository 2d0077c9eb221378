pub mod batch;
pub mod catalog;
pub mod gather;
pub mod installments;
pub mod ledger;
pub mod report;
pub mod substitution;

pub use crate::domain::model::*;
pub use crate::domain::ports::{
    AttendanceStore, Clock, ConfigProvider, EnrollmentStore, FixedClock, IdentityProvider,
    LedgerEvent, Notifier, SessionStore, SubstitutionStore, SystemClock,
};
pub use crate::utils::error::Result;
