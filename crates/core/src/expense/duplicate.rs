//! Duplicate submission detection.
//!
//! Two rules, checked in order:
//! 1. Same owner and same receipt fingerprint, regardless of age.
//! 2. Same owner, identical merchant and amount, created inside the trailing
//!    window.
//!
//! Lookup failures fail open: intake is never blocked by a storage fault,
//! but every such miss is logged at `warn` level.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use expensa_shared::types::{ExpenseId, UserId};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::expense::error::ExpenseError;
use crate::store::ExpenseStore;

/// Lowercase hex SHA-256 of raw receipt bytes.
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Which rule flagged a submission as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateMatch {
    /// Same receipt bytes were filed before.
    Fingerprint(ExpenseId),
    /// Same merchant and amount inside the window.
    MerchantAmount(ExpenseId),
}

impl DuplicateMatch {
    /// The earlier expense that matched.
    #[must_use]
    pub fn existing(&self) -> ExpenseId {
        match self {
            Self::Fingerprint(id) | Self::MerchantAmount(id) => *id,
        }
    }

    /// Converts the match into the conflict returned to the caller.
    #[must_use]
    pub fn into_error(self, merchant: &str, amount: Decimal) -> ExpenseError {
        match self {
            Self::Fingerprint(existing) => ExpenseError::DuplicateReceipt(existing),
            Self::MerchantAmount(existing) => ExpenseError::DuplicateSubmission {
                existing,
                merchant: merchant.to_string(),
                amount,
            },
        }
    }
}

/// Read-only duplicate check over stored expenses.
#[derive(Clone)]
pub struct DuplicateDetector {
    expenses: Arc<dyn ExpenseStore>,
    window: Duration,
}

impl DuplicateDetector {
    /// Creates a detector with a trailing window of `window_hours`.
    #[must_use]
    pub fn new(expenses: Arc<dyn ExpenseStore>, window_hours: i64) -> Self {
        Self {
            expenses,
            window: Duration::hours(window_hours),
        }
    }

    /// Returns the trailing window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Finds an earlier expense this submission duplicates, if any.
    pub async fn find_duplicate(
        &self,
        owner: UserId,
        fingerprint: Option<&str>,
        merchant: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Option<DuplicateMatch> {
        if let Some(fp) = fingerprint {
            match self.expenses.find_by_fingerprint(owner, fp).await {
                Ok(Some(existing)) => return Some(DuplicateMatch::Fingerprint(existing.id)),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        owner_id = %owner,
                        error = %e,
                        "Fingerprint lookup failed, accepting receipt without duplicate check"
                    );
                }
            }
        }

        let since = now - self.window;
        match self
            .expenses
            .find_recent_match(owner, merchant, amount, since)
            .await
        {
            Ok(found) => found.map(|existing| DuplicateMatch::MerchantAmount(existing.id)),
            Err(e) => {
                warn!(
                    owner_id = %owner,
                    error = %e,
                    "Merchant/amount lookup failed, accepting expense without duplicate check"
                );
                None
            }
        }
    }

    /// Returns true if the submission duplicates an earlier expense.
    pub async fn is_duplicate(
        &self,
        owner: UserId,
        fingerprint: Option<&str>,
        merchant: &str,
        amount: Decimal,
    ) -> bool {
        self.find_duplicate(owner, fingerprint, merchant, amount, Utc::now())
            .await
            .is_some()
    }
}
