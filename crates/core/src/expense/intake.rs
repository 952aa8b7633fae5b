//! Receipt extraction.
//!
//! Turns an uploaded receipt into a [`NewExpense`] by asking the language
//! model for a structured reading of the document. Validation and the
//! duplicate check happen afterwards in the service.

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::ai::{InlineDocument, LanguageModel, ModelRequest, generate_with_timeout, parse_json_response};
use crate::expense::error::ExpenseError;
use crate::expense::types::NewExpense;

const EXTRACTION_SYSTEM: &str = "You read receipts and invoices for an expense system. \
Answer with a single JSON object and nothing else.";

const EXTRACTION_PROMPT: &str = r#"Extract the expense from the attached receipt.
Return JSON with exactly these fields:
{
  "merchant": "name of the business",
  "amount": 0.00,
  "currency": "three letter ISO code",
  "date": "YYYY-MM-DD",
  "category": "best matching expense category",
  "description": "one short line describing the purchase"
}
Use the grand total including tax for amount. Use null for anything you cannot read."#;

/// An uploaded receipt.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    /// Raw file bytes.
    pub bytes: Vec<u8>,
    /// MIME type reported by the client.
    pub mime_type: String,
}

/// Fields read from a receipt by the model.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExtractedReceipt {
    /// Merchant name.
    #[serde(default)]
    pub merchant: Option<String>,
    /// Grand total.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Date as written by the model.
    #[serde(default)]
    pub date: Option<String>,
    /// Suggested category.
    #[serde(default)]
    pub category: Option<String>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ExtractedReceipt {
    /// Converts the reading into intake input.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::Extraction` when merchant or amount could not
    /// be read.
    pub fn into_new_expense(self) -> Result<NewExpense, ExpenseError> {
        let merchant = self
            .merchant
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ExpenseError::Extraction("merchant could not be read".to_string()))?;
        let amount = self
            .amount
            .ok_or_else(|| ExpenseError::Extraction("amount could not be read".to_string()))?;

        Ok(NewExpense {
            merchant,
            amount,
            currency: self
                .currency
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_default(),
            category: self.category,
            description: self.description,
            expense_date: self
                .date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
        })
    }
}

/// Asks the model to read `upload`.
///
/// # Errors
///
/// Returns `ExpenseError::Extraction` on timeout, transport failure or an
/// unreadable response.
pub async fn extract_receipt(
    model: &dyn LanguageModel,
    upload: &ReceiptUpload,
    timeout: Duration,
) -> Result<ExtractedReceipt, ExpenseError> {
    let request = ModelRequest::new(EXTRACTION_PROMPT)
        .with_system(EXTRACTION_SYSTEM)
        .with_attachment(InlineDocument::from_bytes(&upload.mime_type, &upload.bytes));

    let text = generate_with_timeout(model, &request, timeout)
        .await
        .map_err(|e| ExpenseError::Extraction(e.to_string()))?;
    debug!(chars = text.len(), "Receipt extraction returned");

    parse_json_response(&text).map_err(|e| ExpenseError::Extraction(e.to_string()))
}
