// 📊 Yearly Statistics - bucket timestamped records by calendar year
//
// Activities (happened_at) and calls (called_at) share one aggregation,
// parameterized by the timestamp accessor.

use chrono::{DateTime, Datelike, Utc};
use std::collections::BTreeMap;

/// Number of records per year, keyed by the 4-digit year
pub type YearlyStatistics = BTreeMap<i32, usize>;

/// Count records per year of the timestamp returned by `timestamp`
///
/// Single pass; a year appears only if at least one record falls in it.
pub fn yearly_statistics<'a, T, I, F>(records: I, timestamp: F) -> YearlyStatistics
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut years = YearlyStatistics::new();

    for record in records {
        *years.entry(timestamp(record).year()).or_insert(0) += 1;
    }

    years
}
