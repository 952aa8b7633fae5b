//! Narrative analysis request and response contract.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregation::ExpenseSummary;
use crate::ai::{AiError, ModelRequest, parse_json_response};

const SYSTEM_INSTRUCTION: &str = "You are a corporate finance analyst. Answer with a single JSON \
object and nothing else. Keys: executive_summary (string), key_insights, spending_patterns, \
anomalies, recommendations, policy_observations (arrays of strings).";

/// Narrative sections returned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSections {
    /// One-paragraph overview.
    pub executive_summary: String,
    /// Key insights.
    #[serde(default)]
    pub key_insights: Vec<String>,
    /// Spending patterns.
    #[serde(default)]
    pub spending_patterns: Vec<String>,
    /// Anomalies worth a look.
    #[serde(default)]
    pub anomalies: Vec<String>,
    /// Recommendations.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Policy observations.
    #[serde(default)]
    pub policy_observations: Vec<String>,
}

/// Metadata sent alongside the summary.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Requester display name.
    pub requester_name: String,
    /// Department name, if any.
    pub department_name: Option<String>,
    /// Department category list.
    pub allowed_categories: Vec<String>,
    /// Canonical reporting currency.
    pub currency: String,
}

/// Builds the analysis request.
///
/// All figures are presented in the context's reporting currency,
/// whatever the source currency of each expense.
#[must_use]
pub fn build_request(
    summary: &ExpenseSummary,
    ctx: &AnalysisContext,
    temperature: Decimal,
) -> ModelRequest {
    let currency = &ctx.currency;
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Requester: {}", ctx.requester_name);
    if let Some(department) = &ctx.department_name {
        let _ = writeln!(prompt, "Department: {department}");
    }
    if !ctx.allowed_categories.is_empty() {
        let _ = writeln!(prompt, "Policy categories: {}", ctx.allowed_categories.join(", "));
    }
    let _ = writeln!(
        prompt,
        "Period: {} to {}\nAll amounts in {currency}.",
        summary.period_from, summary.period_to
    );
    let _ = writeln!(
        prompt,
        "\nTotals: {} expenses, {currency} {} total, {currency} {} average.",
        summary.total_count, summary.total_amount, summary.average_amount
    );
    if let Some(largest) = &summary.largest_expense {
        let _ = writeln!(
            prompt,
            "Largest expense: {} {currency} {} ({}).",
            largest.merchant, largest.amount, largest.category
        );
    }

    push_groups(&mut prompt, "By category", currency, &summary.by_category);
    push_groups(&mut prompt, "By month", currency, &summary.by_month);
    push_groups(&mut prompt, "By employee", currency, &summary.by_employee);

    if !summary.top_merchants.is_empty() {
        prompt.push_str("\nTop merchants:\n");
        for m in &summary.top_merchants {
            let _ = writeln!(
                prompt,
                "- {}: {currency} {} across {} expenses ({}%)",
                m.merchant, m.amount, m.count, m.percentage
            );
        }
    }

    let _ = writeln!(prompt, "\nTrend: {}", summary.trend.direction.label());
    if let Some(change) = summary.trend.change_pct {
        let _ = writeln!(prompt, "Month-over-month change: {change}%");
    }

    ModelRequest::new(prompt)
        .with_system(SYSTEM_INSTRUCTION)
        .with_temperature(temperature)
}

fn push_groups(
    prompt: &mut String,
    heading: &str,
    currency: &str,
    groups: &[crate::aggregation::GroupTotal],
) {
    if groups.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "\n{heading}:");
    for g in groups {
        let _ = writeln!(
            prompt,
            "- {}: {currency} {} across {} expenses ({}%)",
            g.label, g.amount, g.count, g.percentage
        );
    }
}

/// Parses the analysis response.
///
/// # Errors
///
/// Returns `AiError::EmptyResponse` or `AiError::MalformedJson` when no
/// usable payload is present, including a blank executive summary.
pub fn parse_response(text: &str) -> Result<AnalysisSections, AiError> {
    let sections: AnalysisSections = parse_json_response(text)?;
    if sections.executive_summary.trim().is_empty() {
        return Err(AiError::MalformedJson(
            "executive_summary is empty".to_string(),
        ));
    }
    Ok(sections)
}
