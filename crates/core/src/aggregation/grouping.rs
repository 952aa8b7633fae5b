//! Ordered grouping maps.
//!
//! [`AppearanceGroups`] iterates in order of first insertion;
//! [`MonthGroups`] iterates chronologically.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::types::GroupTotal;

/// Running count and sum for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Display label.
    pub label: String,
    /// Number of items.
    pub count: u64,
    /// Summed amount.
    pub amount: Decimal,
}

impl Bucket {
    fn new(label: String) -> Self {
        Self {
            label,
            count: 0,
            amount: Decimal::ZERO,
        }
    }

    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount += amount;
    }
}

/// Share of `total`, in percent, rounded to 2 dp. Zero for a zero total.
#[must_use]
pub fn percentage(amount: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        (amount / total * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// Groups keyed by `K`, iterated in order of first appearance.
#[derive(Debug, Clone)]
pub struct AppearanceGroups<K> {
    entries: Vec<(K, Bucket)>,
    index: HashMap<K, usize>,
}

impl<K> Default for AppearanceGroups<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> AppearanceGroups<K> {
    /// Adds `amount` to the group for `key`, creating it with `label` on
    /// first sight.
    pub fn add(&mut self, key: K, label: impl FnOnce() -> String, amount: Decimal) {
        let slot = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.entries.push((key.clone(), Bucket::new(label())));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.entries[slot].1.add(amount);
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no group exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates groups in appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Bucket)> {
        self.entries.iter().map(|(k, b)| (k, b))
    }

    /// Consumes the map, yielding groups in appearance order.
    pub fn into_entries(self) -> Vec<(K, Bucket)> {
        self.entries
    }
}

impl<K: Clone + Eq + Hash + ToString> AppearanceGroups<K> {
    /// Renders the groups against `total`.
    #[must_use]
    pub fn totals(&self, total: Decimal) -> Vec<GroupTotal> {
        self.iter()
            .map(|(key, bucket)| GroupTotal {
                key: key.to_string(),
                label: bucket.label.clone(),
                count: bucket.count,
                amount: bucket.amount,
                percentage: percentage(bucket.amount, total),
            })
            .collect()
    }
}

/// Groups keyed by calendar month, iterated chronologically.
#[derive(Debug, Clone, Default)]
pub struct MonthGroups {
    months: BTreeMap<(i32, u32), Bucket>,
}

impl MonthGroups {
    /// Adds `amount` to the month containing `date`.
    pub fn add(&mut self, date: NaiveDate, amount: Decimal) {
        let key = (date.year(), date.month());
        self.months
            .entry(key)
            .or_insert_with(|| Bucket::new(month_key(key)))
            .add(amount);
    }

    /// Monthly sums in chronological order, as `(YYYY-MM, amount)`.
    pub fn amounts(&self) -> impl Iterator<Item = (String, Decimal)> + '_ {
        self.months.iter().map(|(k, b)| (month_key(*k), b.amount))
    }

    /// Renders the months against `total`.
    #[must_use]
    pub fn totals(&self, total: Decimal) -> Vec<GroupTotal> {
        self.months
            .iter()
            .map(|(key, bucket)| GroupTotal {
                key: month_key(*key),
                label: bucket.label.clone(),
                count: bucket.count,
                amount: bucket.amount,
                percentage: percentage(bucket.amount, total),
            })
            .collect()
    }
}

fn month_key((year, month): (i32, u32)) -> String {
    format!("{year:04}-{month:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_appearance_order_is_kept() {
        let mut groups = AppearanceGroups::default();
        groups.add("Travel".to_string(), || "Travel".to_string(), dec!(10));
        groups.add("Meals".to_string(), || "Meals".to_string(), dec!(5));
        groups.add("Travel".to_string(), || unreachable!(), dec!(2));

        let keys: Vec<&String> = groups.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Travel", "Meals"]);
        let travel = groups.iter().next().unwrap().1;
        assert_eq!(travel.count, 2);
        assert_eq!(travel.amount, dec!(12));
    }

    #[test]
    fn test_months_are_chronological() {
        let mut months = MonthGroups::default();
        months.add(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(), dec!(1));
        months.add(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(), dec!(2));
        months.add(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), dec!(3));

        let keys: Vec<String> = months.amounts().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["2025-12", "2026-01", "2026-03"]);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(percentage(dec!(5), dec!(0)), dec!(0));
    }
}
