use chrono::Timelike;
use serde::Serialize;

use super::model::{Category, CollisionRecord, CollisionTable};

/// Upper bound of the injury-threshold control.
pub const MAX_INJURY_THRESHOLD: u32 = 20;

/// Upper bound of the hour control. Deliberately 24, matching the original
/// dashboard slider: hour-of-day is only ever 0–23, so asking for hour 24
/// yields an empty view. See [`by_hour`].
pub const MAX_HOUR: u32 = 24;

/// Default number of entries in the street ranking.
pub const DEFAULT_RANKING_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Derived-view types
// ---------------------------------------------------------------------------

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// The subset of a table matching one hour-of-day, plus where to center a
/// map showing it.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyView {
    /// The hour this view was filtered to (after clamping).
    pub hour: u32,
    pub records: Vec<CollisionRecord>,
    /// Mean position of `records`; `None` when the view is empty, so an
    /// empty hour never produces a NaN map center.
    pub centroid: Option<Coordinate>,
}

impl HourlyView {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One entry of the top-streets ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetRanking {
    pub street: String,
    pub injured: u32,
}

// ---------------------------------------------------------------------------
// Derivations – pure functions, no I/O, no mutation
// ---------------------------------------------------------------------------

/// Coordinates of every collision that injured at least `threshold` people.
///
/// Records without an injured-persons count are excluded: a missing count is
/// unknown, not zero. `threshold` is clamped to 0..=[`MAX_INJURY_THRESHOLD`],
/// the range the dashboard slider offers.
pub fn injury_hotspots(table: &CollisionTable, threshold: u32) -> Vec<Coordinate> {
    let threshold = threshold.min(MAX_INJURY_THRESHOLD);
    table
        .records
        .iter()
        .filter(|rec| rec.injured_persons.is_some_and(|n| n >= threshold))
        .map(|rec| Coordinate {
            latitude: rec.latitude,
            longitude: rec.longitude,
        })
        .collect()
}

/// All collisions whose timestamp falls in the given hour-of-day, with the
/// centroid of the subset.
///
/// `hour` is clamped to 0..=[`MAX_HOUR`]. Hour 24 is a real position on the
/// original slider but matches no timestamp, so it returns an empty view
/// with no centroid.
pub fn by_hour(table: &CollisionTable, hour: u32) -> HourlyView {
    let hour = hour.min(MAX_HOUR);
    let records: Vec<CollisionRecord> = table
        .records
        .iter()
        .filter(|rec| rec.timestamp.hour() == hour)
        .cloned()
        .collect();
    let centroid = centroid(&records);

    HourlyView {
        hour,
        records,
        centroid,
    }
}

/// Mean latitude/longitude of a set of records, or `None` for an empty set.
pub fn centroid(records: &[CollisionRecord]) -> Option<Coordinate> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;
    Some(Coordinate {
        latitude: records.iter().map(|r| r.latitude).sum::<f64>() / n,
        longitude: records.iter().map(|r| r.longitude).sum::<f64>() / n,
    })
}

/// Count the view's collisions into 60 minute buckets.
///
/// Covers the half-open window `[hour, hour + 1)`: exactly the records of
/// the view's hour, bucketed by minute, zero-filled where no collision fell.
pub fn minute_histogram(view: &HourlyView) -> [u32; 60] {
    let mut buckets = [0u32; 60];
    for rec in &view.records {
        if rec.timestamp.hour() == view.hour {
            buckets[rec.timestamp.minute() as usize] += 1;
        }
    }
    buckets
}

/// The `limit` streets with the most collisions injuring at least one person
/// of the selected category.
///
/// Always reads the full table, never an hour-filtered view: the ranking
/// answers a dataset-wide question. Records without a street name or
/// without a count for the category are excluded. Entries sort descending
/// by count; ties keep the original row order (the sort is stable).
pub fn top_affected(
    table: &CollisionTable,
    category: Category,
    limit: usize,
) -> Vec<StreetRanking> {
    let mut ranking: Vec<StreetRanking> = table
        .records
        .iter()
        .filter_map(|rec| {
            let injured = rec.injured_in(category).filter(|&n| n >= 1)?;
            let street = rec.on_street_name.clone()?;
            Some(StreetRanking { street, injured })
        })
        .collect();

    ranking.sort_by(|a, b| b.injured.cmp(&a.injured));
    ranking.truncate(limit);
    ranking
}
