//! User and department repositories.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use expensa_core::expense::types::{Department, User};
use expensa_core::store::{DepartmentStore, StoreError, UserStore};
use expensa_shared::types::{DepartmentId, UserId};

use crate::entities::{departments, users};

use super::convert::{db_err, department_from_model, to_json, user_from_model};

/// User repository backed by Postgres.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, user: &User) -> Result<(), StoreError> {
        let now = chrono::Utc::now().into();
        users::ActiveModel {
            id: Set(user.id.into_inner()),
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            role: Set(user.role.as_str().to_string()),
            department_id: Set(user.department_id.map(DepartmentId::into_inner)),
            allotted_limit: Set(user.allotted_limit),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(user_from_model)
            .transpose()
    }

    async fn list_by_department(&self, department: DepartmentId) -> Result<Vec<User>, StoreError> {
        users::Entity::find()
            .filter(users::Column::DepartmentId.eq(department.into_inner()))
            .order_by_asc(users::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(user_from_model)
            .collect()
    }

    async fn debit_limit(&self, id: UserId, amount: Decimal) -> Result<Decimal, StoreError> {
        // The row lock taken by the update holds until commit, so the value
        // read back is the one this debit produced.
        let txn = self.db.begin().await.map_err(db_err)?;

        let result = users::Entity::update_many()
            .col_expr(
                users::Column::AllottedLimit,
                Expr::col(users::Column::AllottedLimit).sub(amount),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(users::Column::Id.eq(id.into_inner()))
            .filter(users::Column::AllottedLimit.is_not_null())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("limit of user {id}")));
        }

        let limit = users::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .and_then(|u| u.allotted_limit)
            .ok_or_else(|| StoreError::NotFound(format!("limit of user {id}")))?;

        txn.commit().await.map_err(db_err)?;
        Ok(limit)
    }
}

/// Department repository backed by Postgres.
#[derive(Debug, Clone)]
pub struct DepartmentRepository {
    db: DatabaseConnection,
}

impl DepartmentRepository {
    /// Creates a new department repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a department.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, department: &Department) -> Result<(), StoreError> {
        let now = chrono::Utc::now().into();
        departments::ActiveModel {
            id: Set(department.id.into_inner()),
            name: Set(department.name.clone()),
            manager_id: Set(department.manager_id.map(UserId::into_inner)),
            total_budget: Set(department.total_budget),
            allowed_categories: Set(to_json(&department.allowed_categories)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl DepartmentStore for DepartmentRepository {
    async fn find(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        departments::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(department_from_model)
            .transpose()
    }
}
