//! Core business logic for Expensa.
//!
//! This crate contains the expense lifecycle and the report pipeline with
//! ZERO web or database dependencies. Persistence and the language model are
//! reached through the traits in [`store`] and [`ai`].
//!
//! # Modules
//!
//! - `expense` - Expense records, state machine, intake and duplicate detection
//! - `budget` - Allotted limit debits and department utilization
//! - `approval` - Auto-approval batch and confirmation step
//! - `aggregation` - Grouping, ranking and trend classification
//! - `reports` - Report pipeline, analysis contract and document rendering
//! - `ai` - Language model request/response contracts
//! - `storage` - Rendered document storage
//! - `store` - Persistence traits implemented by the database layer

pub mod aggregation;
pub mod ai;
pub mod approval;
pub mod budget;
pub mod expense;
pub mod reports;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
