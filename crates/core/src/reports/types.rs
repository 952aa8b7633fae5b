//! Report types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use expensa_shared::types::{DepartmentId, ExpenseId, ReportId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregation::ExpenseSummary;
use crate::reports::analysis::AnalysisSections;

/// Whose expenses a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// The requester's own expenses.
    Individual,
    /// A department's expenses.
    Team,
}

impl ReportKind {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Team => "team",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "individual" => Some(Self::Individual),
            "team" => Some(Self::Team),
            _ => None,
        }
    }

    /// Title-case label used in default titles.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Team => "Team",
        }
    }
}

/// Report status. Moves one way: Generating → Completed or Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Pipeline running.
    Generating,
    /// Analysis stored.
    Completed,
    /// Pipeline stopped; see the error detail.
    Failed,
}

impl ReportStatus {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generating" => Some(Self::Generating),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true once the pipeline has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Generating)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named period expanded around the current date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedPeriod {
    /// Sunday through Saturday.
    Weekly,
    /// Calendar month.
    #[default]
    Monthly,
    /// Calendar year.
    Yearly,
}

/// What the caller asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Individual or team.
    pub kind: ReportKind,
    /// Named period, used when no explicit dates are given.
    #[serde(default)]
    pub period: Option<NamedPeriod>,
    /// Explicit first day.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Explicit last day.
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Custom title.
    #[serde(default)]
    pub title: Option<String>,
    /// Category filter; empty means all.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Department for team reports; defaults to the requester's.
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    /// Narrows a team report to these employees.
    #[serde(default)]
    pub employee_ids: Vec<UserId>,
}

impl ReportRequest {
    /// An individual report over the default period.
    #[must_use]
    pub fn individual() -> Self {
        Self {
            kind: ReportKind::Individual,
            period: None,
            from: None,
            to: None,
            title: None,
            categories: Vec::new(),
            department_id: None,
            employee_ids: Vec::new(),
        }
    }

    /// A team report over the default period.
    #[must_use]
    pub fn team() -> Self {
        Self {
            kind: ReportKind::Team,
            ..Self::individual()
        }
    }
}

/// The resolved filter a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportScope {
    /// Individual or team.
    pub kind: ReportKind,
    /// First day.
    pub from: NaiveDate,
    /// Last day.
    pub to: NaiveDate,
    /// Category filter.
    pub categories: Vec<String>,
    /// Department for team reports.
    pub department_id: Option<DepartmentId>,
    /// Employee filter for team reports.
    pub employee_ids: Vec<UserId>,
}

/// A generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Internal id.
    pub id: ReportId,
    /// Requesting user.
    pub owner_id: UserId,
    /// Human-readable unique id.
    pub external_id: String,
    /// Title.
    pub title: String,
    /// Scope.
    pub scope: ReportScope,
    /// Status.
    pub status: ReportStatus,
    /// Aggregation output; set before analysis is requested.
    pub summary: Option<ExpenseSummary>,
    /// Analysis sections; set together with Completed.
    pub analysis: Option<AnalysisSections>,
    /// Expenses included, as weak references.
    pub expense_ids: Vec<ExpenseId>,
    /// Where the rendered document is stored.
    pub document_location: Option<String>,
    /// Cause of failure.
    pub error_detail: Option<String>,
    /// Last render failure; never affects status.
    pub render_error: Option<String>,
    /// When generation started.
    pub generated_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportListFilter {
    /// Only this status.
    #[serde(default)]
    pub status: Option<ReportStatus>,
    /// Generated at or after.
    #[serde(default)]
    pub generated_from: Option<DateTime<Utc>>,
    /// Generated at or before.
    #[serde(default)]
    pub generated_to: Option<DateTime<Utc>>,
}

impl ReportListFilter {
    /// Returns true if `report` passes the filter.
    #[must_use]
    pub fn matches(&self, report: &Report) -> bool {
        self.status.is_none_or(|s| report.status == s)
            && self.generated_from.is_none_or(|from| report.generated_at >= from)
            && self.generated_to.is_none_or(|to| report.generated_at <= to)
    }
}
