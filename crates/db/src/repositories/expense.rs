//! Expense repository.
//!
//! Status changes are conditional `UPDATE ... WHERE` statements on the
//! status columns that were read; a zero row count means another writer
//! moved the expense first.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use expensa_core::expense::types::{AuditComment, Expense, ExpenseFilter, ExpenseState};
use expensa_core::expense::workflow::ExpenseTransition;
use expensa_core::store::{ExpenseStore, StoreError};
use expensa_shared::types::{ExpenseId, UserId};

use crate::entities::{expense_comments, expenses};

use super::convert::{comment_from_model, db_err, expense_from_model};

/// Expense repository backed by Postgres.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads comments for `models` in one query and maps them.
    async fn hydrate(&self, models: Vec<expenses::Model>) -> Result<Vec<Expense>, StoreError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut comments: HashMap<Uuid, Vec<AuditComment>> = HashMap::new();
        for comment in expense_comments::Entity::find()
            .filter(expense_comments::Column::ExpenseId.is_in(ids))
            .order_by_asc(expense_comments::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            comments
                .entry(comment.expense_id)
                .or_default()
                .push(comment_from_model(comment));
        }

        models
            .into_iter()
            .map(|m| {
                let thread = comments.remove(&m.id).unwrap_or_default();
                expense_from_model(m, thread)
            })
            .collect()
    }

    async fn hydrate_one(
        &self,
        model: Option<expenses::Model>,
    ) -> Result<Option<Expense>, StoreError> {
        match model {
            Some(m) => Ok(self.hydrate(vec![m]).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Restricts a query to rows currently in `state`.
fn in_state<Q: QueryFilter>(query: Q, state: ExpenseState) -> Q {
    let (submission, approval) = state.statuses();
    let query = query.filter(expenses::Column::SubmissionStatus.eq(submission.as_str()));
    if state == ExpenseState::Draft {
        query
    } else {
        query.filter(expenses::Column::ApprovalStatus.eq(approval.as_str()))
    }
}

#[async_trait]
impl ExpenseStore for ExpenseRepository {
    async fn insert(&self, expense: &Expense) -> Result<(), StoreError> {
        expenses::ActiveModel {
            id: Set(expense.id.into_inner()),
            owner_id: Set(expense.owner_id.into_inner()),
            department_id: Set(expense.department_id.map(|d| d.into_inner())),
            department_name: Set(expense.department_name.clone()),
            merchant: Set(expense.merchant.clone()),
            amount: Set(expense.amount),
            currency: Set(expense.currency.clone()),
            category: Set(expense.category.clone()),
            description: Set(expense.description.clone()),
            expense_date: Set(expense.expense_date),
            fingerprint: Set(expense.fingerprint.clone()),
            submission_status: Set(expense.submission_status.as_str().to_string()),
            approval_status: Set(expense.approval_status.as_str().to_string()),
            rejection_reason: Set(expense.rejection_reason.clone()),
            submitted_by: Set(None),
            submitted_at: Set(None),
            flagged_at: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            approval_source: Set(None),
            rejected_by: Set(None),
            rejected_at: Set(None),
            created_at: Set(expense.created_at.into()),
            updated_at: Set(expense.updated_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError> {
        let model = expenses::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate_one(model).await
    }

    async fn save_draft(&self, expense: &Expense) -> Result<bool, StoreError> {
        let result = expenses::Entity::update_many()
            .col_expr(expenses::Column::Merchant, Expr::value(expense.merchant.clone()))
            .col_expr(expenses::Column::Amount, Expr::value(expense.amount))
            .col_expr(expenses::Column::Currency, Expr::value(expense.currency.clone()))
            .col_expr(expenses::Column::Category, Expr::value(expense.category.clone()))
            .col_expr(
                expenses::Column::Description,
                Expr::value(expense.description.clone()),
            )
            .col_expr(expenses::Column::ExpenseDate, Expr::value(expense.expense_date))
            .col_expr(expenses::Column::UpdatedAt, Expr::value(expense.updated_at))
            .filter(expenses::Column::Id.eq(expense.id.into_inner()))
            .filter(expenses::Column::SubmissionStatus.eq("draft"))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected == 1)
    }

    async fn delete_draft(&self, id: ExpenseId) -> Result<bool, StoreError> {
        let result = expenses::Entity::delete_many()
            .filter(expenses::Column::Id.eq(id.into_inner()))
            .filter(expenses::Column::SubmissionStatus.eq("draft"))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected == 1)
    }

    async fn find_by_fingerprint(
        &self,
        owner: UserId,
        fingerprint: &str,
    ) -> Result<Option<Expense>, StoreError> {
        let model = expenses::Entity::find()
            .filter(expenses::Column::OwnerId.eq(owner.into_inner()))
            .filter(expenses::Column::Fingerprint.eq(fingerprint))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate_one(model).await
    }

    async fn find_recent_match(
        &self,
        owner: UserId,
        merchant: &str,
        amount: Decimal,
        since: DateTime<Utc>,
    ) -> Result<Option<Expense>, StoreError> {
        let model = expenses::Entity::find()
            .filter(expenses::Column::OwnerId.eq(owner.into_inner()))
            .filter(Expr::cust_with_values(
                "lower(merchant) = lower($1)",
                [merchant.trim().to_string()],
            ))
            .filter(expenses::Column::Amount.eq(amount))
            .filter(expenses::Column::CreatedAt.gte(since))
            .order_by_desc(expenses::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate_one(model).await
    }

    async fn list_in_state(&self, state: ExpenseState) -> Result<Vec<Expense>, StoreError> {
        let models = in_state(expenses::Entity::find(), state)
            .order_by_asc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate(models).await
    }

    async fn apply_transition(
        &self,
        id: ExpenseId,
        expected: ExpenseState,
        transition: &ExpenseTransition,
    ) -> Result<bool, StoreError> {
        let (submission, approval) = transition.target().statuses();
        let mut update = expenses::Entity::update_many()
            .col_expr(
                expenses::Column::SubmissionStatus,
                Expr::value(submission.as_str()),
            )
            .col_expr(expenses::Column::ApprovalStatus, Expr::value(approval.as_str()))
            .col_expr(expenses::Column::UpdatedAt, Expr::value(transition.occurred_at()));

        update = match transition {
            ExpenseTransition::Submit {
                submitted_by,
                submitted_at,
            } => update
                .col_expr(
                    expenses::Column::SubmittedBy,
                    Expr::value(submitted_by.into_inner()),
                )
                .col_expr(expenses::Column::SubmittedAt, Expr::value(*submitted_at)),
            ExpenseTransition::AutoFlag { flagged_at } => {
                update.col_expr(expenses::Column::FlaggedAt, Expr::value(*flagged_at))
            }
            ExpenseTransition::Approve {
                approved_by,
                approved_at,
                source,
            } => {
                let source = match source {
                    expensa_core::expense::workflow::ApprovalSource::Confirmation => "confirmation",
                    expensa_core::expense::workflow::ApprovalSource::Manager => "manager",
                };
                update
                    .col_expr(
                        expenses::Column::ApprovedBy,
                        Expr::value(approved_by.map(UserId::into_inner)),
                    )
                    .col_expr(expenses::Column::ApprovedAt, Expr::value(*approved_at))
                    .col_expr(expenses::Column::ApprovalSource, Expr::value(source))
            }
            ExpenseTransition::Reject {
                rejected_by,
                rejected_at,
                reason,
            } => update
                .col_expr(
                    expenses::Column::RejectedBy,
                    Expr::value(rejected_by.map(UserId::into_inner)),
                )
                .col_expr(expenses::Column::RejectedAt, Expr::value(*rejected_at))
                .col_expr(
                    expenses::Column::RejectionReason,
                    Expr::value(reason.clone()),
                ),
        };

        let result = in_state(
            update.filter(expenses::Column::Id.eq(id.into_inner())),
            expected,
        )
        .exec(&self.db)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected == 1)
    }

    async fn append_comment(
        &self,
        id: ExpenseId,
        comment: &AuditComment,
    ) -> Result<bool, StoreError> {
        let exists = expenses::Entity::find_by_id(id.into_inner())
            .select_only()
            .column(expenses::Column::Id)
            .into_tuple::<Uuid>()
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            return Ok(false);
        }

        expense_comments::ActiveModel {
            id: Set(Uuid::now_v7()),
            expense_id: Set(id.into_inner()),
            author_id: Set(comment.author_id.into_inner()),
            body: Set(comment.body.clone()),
            created_at: Set(comment.created_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(true)
    }

    async fn find_approved(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
        if filter.owners.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = in_state(expenses::Entity::find(), ExpenseState::Approved)
            .filter(expenses::Column::OwnerId.is_in(filter.owners.iter().map(|o| o.into_inner())))
            .filter(expenses::Column::ExpenseDate.is_not_null());
        if let Some(from) = filter.from {
            query = query.filter(expenses::Column::ExpenseDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(expenses::Column::ExpenseDate.lte(to));
        }

        let models = query
            .order_by_desc(expenses::Column::ExpenseDate)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        // Category matching is case-insensitive; apply it on the mapped rows.
        Ok(self
            .hydrate(models)
            .await?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }

    async fn approved_total(&self, owners: &[UserId]) -> Result<Decimal, StoreError> {
        if owners.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let total: Option<Option<Decimal>> =
            in_state(expenses::Entity::find(), ExpenseState::Approved)
                .filter(expenses::Column::OwnerId.is_in(owners.iter().map(|o| o.into_inner())))
                .select_only()
                .column_as(expenses::Column::Amount.sum(), "total")
                .into_tuple()
                .one(&self.db)
                .await
                .map_err(db_err)?;

        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }
}
