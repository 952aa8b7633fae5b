//! Budget ledger: allotted limit debits and department utilization.

pub mod error;
pub mod service;
pub mod types;

pub use error::BudgetError;
pub use service::BudgetLedger;
pub use types::{DepartmentUtilization, LedgerDebit, debit, remaining_pct};
