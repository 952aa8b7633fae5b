//! `SeaORM` entity definitions.

pub mod departments;
pub mod expense_comments;
pub mod expenses;
pub mod reports;
pub mod users;

/// Common imports.
pub mod prelude {
    pub use super::departments::Entity as Departments;
    pub use super::expense_comments::Entity as ExpenseComments;
    pub use super::expenses::Entity as Expenses;
    pub use super::reports::Entity as Reports;
    pub use super::users::Entity as Users;
}
