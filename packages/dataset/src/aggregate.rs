//! Group-by and mean helpers over observation rows.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use agri_map_dataset_models::{Granularity, ObservationRecord, Series};

/// Running sum and count for one group. Missing values are not counted.
#[derive(Debug, Default, Clone, Copy)]
struct MeanAccumulator {
    sum: f64,
    count: u32,
}

impl MeanAccumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

/// Means variable column `column` over `rows`, grouped by the key
/// `granularity` selects.
///
/// Rows without a group key are skipped. Groups are returned in
/// [`compare_keys`] order.
#[must_use]
pub fn mean_by_group<'a, I>(rows: I, granularity: Granularity, column: usize) -> Series
where
    I: IntoIterator<Item = &'a ObservationRecord>,
{
    let mut groups: BTreeMap<&str, MeanAccumulator> = BTreeMap::new();

    for row in rows {
        let Some(key) = row.group_key(granularity) else {
            continue;
        };
        groups.entry(key).or_default().push(row.value(column));
    }

    let mut points: Vec<(String, Option<f64>)> = groups
        .into_iter()
        .map(|(key, acc)| (key.to_owned(), acc.mean()))
        .collect();
    points.sort_by(|(a, _), (b, _)| compare_keys(a, b));

    Series { points }
}

/// Orders group keys numerically when both parse as numbers, lexically
/// otherwise. Month labels such as `"2"` and `"10"` sort as months; numeric
/// keys sort before all others.
#[must_use]
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Rounds `value` to `decimals` places.
///
/// Rounding works on the exact binary value with ties to even, so `2.25`
/// gives `2.2` and `1.15` (stored just below) gives `1.1`.
#[must_use]
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.decimals$}").parse().unwrap_or(value)
}
