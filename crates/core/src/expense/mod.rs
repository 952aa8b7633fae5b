//! Expense records and their lifecycle.
//!
//! This module provides:
//! - Expense, user and department types
//! - The lifecycle state machine
//! - Duplicate detection and receipt intake
//! - The service tying intake, editing and manual decisions together

pub mod duplicate;
pub mod error;
pub mod intake;
pub mod service;
pub mod types;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod validation_props;

pub use duplicate::{DuplicateDetector, DuplicateMatch, fingerprint};
pub use error::ExpenseError;
pub use intake::{ExtractedReceipt, ReceiptUpload, extract_receipt};
pub use service::{ExpenseService, ExpenseStores};
pub use types::{
    ApprovalStatus, AuditComment, Department, Expense, ExpenseFilter, ExpenseState,
    ExpenseUpdate, NewExpense, SubmissionStatus, User, UserRole,
};
pub use workflow::{ApprovalSource, ExpenseTransition, ExpenseWorkflow};
