//! Mapping between `SeaORM` models and core domain types.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::DbErr;
use serde::de::DeserializeOwned;

use expensa_core::expense::types::{
    ApprovalStatus, AuditComment, Department, Expense, SubmissionStatus, User, UserRole,
};
use expensa_core::reports::types::{Report, ReportKind, ReportScope, ReportStatus};
use expensa_core::store::StoreError;

use crate::entities::{departments, expense_comments, expenses, reports, users};

/// Wraps a database error.
pub(crate) fn db_err(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub(crate) fn utc(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!("unknown {what} '{value}'"))
}

fn from_json<T: DeserializeOwned>(what: &str, value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(format!("{what}: {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

pub(crate) fn comment_from_model(model: expense_comments::Model) -> AuditComment {
    AuditComment {
        author_id: model.author_id.into(),
        body: model.body,
        created_at: utc(model.created_at),
    }
}

pub(crate) fn expense_from_model(
    model: expenses::Model,
    comments: Vec<AuditComment>,
) -> Result<Expense, StoreError> {
    let submission_status = SubmissionStatus::parse(&model.submission_status)
        .ok_or_else(|| corrupt("submission status", &model.submission_status))?;
    let approval_status = ApprovalStatus::parse(&model.approval_status)
        .ok_or_else(|| corrupt("approval status", &model.approval_status))?;

    Ok(Expense {
        id: model.id.into(),
        owner_id: model.owner_id.into(),
        department_id: model.department_id.map(Into::into),
        department_name: model.department_name,
        merchant: model.merchant,
        amount: model.amount,
        currency: model.currency.trim().to_string(),
        category: model.category,
        description: model.description,
        expense_date: model.expense_date,
        fingerprint: model.fingerprint,
        submission_status,
        approval_status,
        rejection_reason: model.rejection_reason,
        comments,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn user_from_model(model: users::Model) -> Result<User, StoreError> {
    let role = UserRole::parse(&model.role).ok_or_else(|| corrupt("role", &model.role))?;
    Ok(User {
        id: model.id.into(),
        name: model.name,
        email: model.email,
        role,
        department_id: model.department_id.map(Into::into),
        allotted_limit: model.allotted_limit,
    })
}

pub(crate) fn department_from_model(model: departments::Model) -> Result<Department, StoreError> {
    Ok(Department {
        id: model.id.into(),
        name: model.name,
        manager_id: model.manager_id.map(Into::into),
        total_budget: model.total_budget,
        allowed_categories: from_json("allowed_categories", model.allowed_categories)?,
    })
}

pub(crate) fn report_from_model(model: reports::Model) -> Result<Report, StoreError> {
    let kind = ReportKind::parse(&model.kind).ok_or_else(|| corrupt("report kind", &model.kind))?;
    let status =
        ReportStatus::parse(&model.status).ok_or_else(|| corrupt("report status", &model.status))?;

    Ok(Report {
        id: model.id.into(),
        owner_id: model.owner_id.into(),
        external_id: model.external_id,
        title: model.title,
        scope: ReportScope {
            kind,
            from: model.period_from,
            to: model.period_to,
            categories: from_json("categories", model.categories)?,
            department_id: model.department_id.map(Into::into),
            employee_ids: from_json("employee_ids", model.employee_ids)?,
        },
        status,
        summary: model.summary.map(|v| from_json("summary", v)).transpose()?,
        analysis: model.analysis.map(|v| from_json("analysis", v)).transpose()?,
        expense_ids: from_json("expense_ids", model.expense_ids)?,
        document_location: model.document_location,
        error_detail: model.error_detail,
        render_error: model.render_error,
        generated_at: utc(model.generated_at),
        updated_at: utc(model.updated_at),
    })
}
