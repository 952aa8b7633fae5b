//! Report repository.
//!
//! Status-changing writes are filtered on `status = 'generating'`; a
//! trigger in the schema rejects any other status change.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use expensa_core::aggregation::ExpenseSummary;
use expensa_core::reports::analysis::AnalysisSections;
use expensa_core::reports::types::{Report, ReportListFilter, ReportStatus};
use expensa_core::store::{ReportStore, StoreError};
use expensa_shared::types::{DepartmentId, ExpenseId, PageRequest, ReportId, UserId};

use crate::entities::reports;

use super::convert::{db_err, report_from_model, to_json};

/// Report repository backed by Postgres.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn update_generating(
        &self,
        id: ReportId,
        update: sea_orm::UpdateMany<reports::Entity>,
    ) -> Result<bool, StoreError> {
        let result = update
            .col_expr(reports::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(reports::Column::Id.eq(id.into_inner()))
            .filter(reports::Column::Status.eq(ReportStatus::Generating.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn update_any(
        &self,
        id: ReportId,
        update: sea_orm::UpdateMany<reports::Entity>,
    ) -> Result<(), StoreError> {
        let result = update
            .col_expr(reports::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(reports::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("report {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn insert(&self, report: &Report) -> Result<(), StoreError> {
        reports::ActiveModel {
            id: Set(report.id.into_inner()),
            owner_id: Set(report.owner_id.into_inner()),
            external_id: Set(report.external_id.clone()),
            title: Set(report.title.clone()),
            kind: Set(report.scope.kind.as_str().to_string()),
            period_from: Set(report.scope.from),
            period_to: Set(report.scope.to),
            categories: Set(to_json(&report.scope.categories)?),
            department_id: Set(report.scope.department_id.map(DepartmentId::into_inner)),
            employee_ids: Set(to_json(&report.scope.employee_ids)?),
            status: Set(report.status.as_str().to_string()),
            summary: Set(report.summary.as_ref().map(to_json).transpose()?),
            analysis: Set(report.analysis.as_ref().map(to_json).transpose()?),
            expense_ids: Set(to_json(&report.expense_ids)?),
            document_location: Set(report.document_location.clone()),
            error_detail: Set(report.error_detail.clone()),
            render_error: Set(report.render_error.clone()),
            generated_at: Set(report.generated_at.into()),
            updated_at: Set(report.updated_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        reports::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(report_from_model)
            .transpose()
    }

    async fn find_by_external_id(
        &self,
        owner: UserId,
        external_id: &str,
    ) -> Result<Option<Report>, StoreError> {
        reports::Entity::find()
            .filter(reports::Column::OwnerId.eq(owner.into_inner()))
            .filter(reports::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(report_from_model)
            .transpose()
    }

    async fn save_summary(
        &self,
        id: ReportId,
        summary: &ExpenseSummary,
        expense_ids: &[ExpenseId],
    ) -> Result<bool, StoreError> {
        let update = reports::Entity::update_many()
            .col_expr(reports::Column::Summary, Expr::value(to_json(summary)?))
            .col_expr(reports::Column::ExpenseIds, Expr::value(to_json(&expense_ids)?));
        self.update_generating(id, update).await
    }

    async fn complete(&self, id: ReportId, analysis: &AnalysisSections) -> Result<bool, StoreError> {
        let update = reports::Entity::update_many()
            .col_expr(reports::Column::Analysis, Expr::value(to_json(analysis)?))
            .col_expr(
                reports::Column::Status,
                Expr::value(ReportStatus::Completed.as_str()),
            );
        self.update_generating(id, update).await
    }

    async fn fail(&self, id: ReportId, cause: &str) -> Result<bool, StoreError> {
        let update = reports::Entity::update_many()
            .col_expr(reports::Column::ErrorDetail, Expr::value(cause))
            .col_expr(
                reports::Column::Status,
                Expr::value(ReportStatus::Failed.as_str()),
            );
        self.update_generating(id, update).await
    }

    async fn set_document(&self, id: ReportId, location: &str) -> Result<(), StoreError> {
        let update = reports::Entity::update_many()
            .col_expr(reports::Column::DocumentLocation, Expr::value(location))
            .col_expr(reports::Column::RenderError, Expr::value(Option::<String>::None));
        self.update_any(id, update).await
    }

    async fn set_render_error(&self, id: ReportId, message: &str) -> Result<(), StoreError> {
        let update =
            reports::Entity::update_many().col_expr(reports::Column::RenderError, Expr::value(message));
        self.update_any(id, update).await
    }

    async fn list(
        &self,
        owner: UserId,
        filter: &ReportListFilter,
        page: PageRequest,
    ) -> Result<(Vec<Report>, u64), StoreError> {
        let mut query =
            reports::Entity::find().filter(reports::Column::OwnerId.eq(owner.into_inner()));
        if let Some(status) = filter.status {
            query = query.filter(reports::Column::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.generated_from {
            query = query.filter(reports::Column::GeneratedAt.gte(from));
        }
        if let Some(to) = filter.generated_to {
            query = query.filter(reports::Column::GeneratedAt.lte(to));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let reports = query
            .order_by_desc(reports::Column::GeneratedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(report_from_model)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((reports, total))
    }
}
