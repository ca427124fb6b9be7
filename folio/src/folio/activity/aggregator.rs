//! Turns raw activity records into a sorted, per-day intensity heatmap.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use log::{debug, warn};

use crate::folio::types::{ActivityRecord, IntensityRecord};

/// The discrete intensity scale, lowest to highest.
pub const INTENSITY_STEPS: [u16; 11] = [0, 100, 200, 300, 400, 500, 600, 700, 800, 900, 950];

/// Intensity given to every day when all buckets are the same size.
pub const FLAT_INTENSITY: u16 = 500;

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Orders by year, then month, then day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<&ActivityRecord> for DayKey {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            year: record.year,
            month: record.month,
            day: record.day,
        }
    }
}

pub type Buckets = BTreeMap<DayKey, Vec<ActivityRecord>>;

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-based). Zero for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        1..=12 => DAYS_IN_MONTH[month as usize - 1],
        _ => 0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    years: Option<RangeInclusive<i32>>,
}

impl Aggregator {
    /// `years` fixes the range that gets gap-filled. Without it every year
    /// holding at least one record is filled.
    pub fn new(years: Option<RangeInclusive<i32>>) -> Self {
        Self { years }
    }

    pub fn aggregate(&self, records: &[ActivityRecord]) -> Vec<IntensityRecord> {
        let mut buckets = group(records);
        let filled = self.fill_gaps(&mut buckets);
        debug!(
            "aggregating {} record(s) into {} day(s), {filled} synthesized",
            records.len(),
            buckets.len()
        );
        sort_and_index(score(&buckets))
    }

    /// Add an empty bucket for every missing day of every month in the
    /// observed years. Returns how many buckets were added.
    pub fn fill_gaps(&self, buckets: &mut Buckets) -> usize {
        let years: BTreeSet<i32> = match &self.years {
            Some(range) => range.clone().collect(),
            None => buckets.keys().map(|key| key.year).collect(),
        };

        let mut added = 0;
        for year in years {
            for month in 1..=12 {
                for day in 1..=days_in_month(year, month) {
                    let key = DayKey { year, month, day };
                    if !buckets.contains_key(&key) {
                        buckets.insert(key, Vec::new());
                        added += 1;
                    }
                }
            }
        }
        added
    }
}

/// Bucket records by calendar day. Records naming a day that does not exist
/// are dropped.
pub fn group(records: &[ActivityRecord]) -> Buckets {
    let mut buckets = Buckets::new();
    for record in records {
        if !record.is_valid() {
            warn!(
                "skipping activity record with invalid date {}-{}-{}",
                record.year, record.month, record.day
            );
            continue;
        }
        buckets.entry(DayKey::from(record)).or_default().push(*record);
    }
    buckets
}

/// Scale a bucket size onto the intensity steps relative to the smallest
/// and largest bucket.
pub fn intensity(frequency: usize, min: usize, max: usize) -> u16 {
    if min == max {
        return FLAT_INTENSITY;
    }
    let normalized = (frequency - min) as f64 / (max - min) as f64;
    let top = (INTENSITY_STEPS.len() - 1) as f64;
    let index = (normalized * top).round_ties_even() as usize;
    INTENSITY_STEPS[index.min(INTENSITY_STEPS.len() - 1)]
}

pub fn score(buckets: &Buckets) -> Vec<(DayKey, u16)> {
    let min = buckets.values().map(Vec::len).min().unwrap_or(0);
    let max = buckets.values().map(Vec::len).max().unwrap_or(0);

    buckets
        .iter()
        .map(|(key, records)| (*key, intensity(records.len(), min, max)))
        .collect()
}

/// Sort by day and number each record with its final position.
pub fn sort_and_index(mut scored: Vec<(DayKey, u16)>) -> Vec<IntensityRecord> {
    scored.sort_by_key(|(key, _)| *key);
    scored
        .into_iter()
        .enumerate()
        .map(|(id, (key, intensity))| IntensityRecord {
            id,
            day: key.day,
            month: key.month,
            year: key.year,
            intensity,
        })
        .collect()
}
