//! Report date range resolution.

use chrono::{Datelike, Duration, NaiveDate};

use super::error::ReportError;
use super::types::{NamedPeriod, ReportKind, ReportRequest};

/// A concrete date range with its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeriod {
    /// First day, inclusive.
    pub from: NaiveDate,
    /// Last day, inclusive.
    pub to: NaiveDate,
    /// Report title.
    pub title: String,
}

/// Resolves the request's range around `today`.
///
/// Explicit dates win and must be given together; otherwise the named
/// period (monthly by default) is expanded.
///
/// # Errors
///
/// * `ReportError::MissingRangeBound` if only one explicit date is given
/// * `ReportError::InvalidRange` if `from` is after `to`
pub fn resolve(request: &ReportRequest, today: NaiveDate) -> Result<ResolvedPeriod, ReportError> {
    let (from, to) = match (request.from, request.to) {
        (Some(from), Some(to)) => {
            if from > to {
                return Err(ReportError::InvalidRange { from, to });
            }
            (from, to)
        }
        (None, None) => expand(request.period.unwrap_or_default(), today),
        _ => return Err(ReportError::MissingRangeBound),
    };

    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or_else(|| default_title(request.kind, from, to), str::to_string);

    Ok(ResolvedPeriod { from, to, title })
}

/// Expands a named period to the calendar range containing `today`.
#[must_use]
pub fn expand(period: NamedPeriod, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        NamedPeriod::Weekly => {
            let since_sunday = i64::from(today.weekday().num_days_from_sunday());
            let sunday = today - Duration::days(since_sunday);
            (sunday, sunday + Duration::days(6))
        }
        NamedPeriod::Monthly => {
            let first = today.with_day(1).unwrap_or(today);
            (first, last_day_of_month(first))
        }
        NamedPeriod::Yearly => {
            let year = today.year();
            (
                NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today),
                NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today),
            )
        }
    }
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

/// Default title embedding both boundary dates.
#[must_use]
pub fn default_title(kind: ReportKind, from: NaiveDate, to: NaiveDate) -> String {
    format!("{} Expense Report: {from} to {to}", kind.label())
}
