//! Auto-approval of submitted expenses.
//!
//! The batch fast-tracks in-limit expenses in configured categories, runs
//! everything else past the policy compliance check, and leaves the final
//! approval to the confirmation step or a manager.

pub mod compliance;
pub mod engine;
pub mod error;

#[cfg(test)]
mod engine_props;

pub use compliance::{ComplianceRequest, ComplianceVerdict};
pub use engine::{
    ApprovalPolicy, AutoApprovalEngine, AutoApprovalReport, ConfirmationReport, Decision,
};
pub use error::{ApprovalError, BatchItemError};
