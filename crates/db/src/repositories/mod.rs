//! Repository abstractions for data access.
//!
//! Each repository implements one of the persistence traits from
//! `expensa_core::store`, hiding the `SeaORM` implementation details from
//! the rest of the application.

mod convert;
pub mod expense;
pub mod report;
pub mod user;

pub use expense::ExpenseRepository;
pub use report::ReportRepository;
pub use user::{DepartmentRepository, UserRepository};
