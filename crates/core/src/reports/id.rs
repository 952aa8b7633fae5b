//! External report identifiers: `<PREFIX>-<8 hex>-<millis>`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generates an external id with `prefix` at `now`.
#[must_use]
pub fn generate_external_id(prefix: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}-{}", &random[..8], now.timestamp_millis())
}

/// Returns true if `id` has the external id shape.
#[must_use]
pub fn is_valid_external_id(id: &str) -> bool {
    let mut parts = id.splitn(3, '-');
    let (Some(prefix), Some(hex), Some(suffix)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !prefix.is_empty()
        && prefix.chars().all(|c| c.is_ascii_uppercase())
        && hex.len() == 8
        && hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        && !suffix.is_empty()
        && suffix.chars().all(|c| c.is_ascii_digit())
}
