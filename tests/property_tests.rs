//! Property-based tests for the filter/aggregate layer.
//!
//! These use proptest to generate random tables and verify the invariants
//! the derivations promise:
//!
//! 1. **Monotonicity**: raising the injury threshold never adds hotspots
//! 2. **Conservation**: the minute histogram always has 60 buckets summing
//!    to the hour window's record count
//! 3. **Ranking shape**: the street ranking respects its limit, its
//!    count floor, and its descending order
//! 4. **Boundary**: hour 24 (the slider's top position) matches nothing

use std::collections::BTreeMap;

use chrono::NaiveDate;
use proptest::prelude::*;

use crashboard::{
    by_hour, injury_hotspots, minute_histogram, top_affected, Category, CollisionRecord,
    CollisionTable,
};

// =============================================================================
// Strategies
// =============================================================================

fn record_strategy() -> impl Strategy<Value = CollisionRecord> {
    (
        0u32..24,
        0u32..60,
        proptest::option::of(0u32..=12),
        proptest::option::of(0u32..=12),
        proptest::option::of(prop_oneof![
            Just("BROADWAY"),
            Just("5TH AVE"),
            Just("QUEENS BLVD"),
            Just("ATLANTIC AVE"),
        ]),
        40.5f64..41.0,
        -74.3f64..-73.7,
    )
        .prop_map(
            |(hour, minute, persons, cyclists, street, latitude, longitude)| CollisionRecord {
                timestamp: NaiveDate::from_ymd_opt(2019, 3, 26)
                    .unwrap()
                    .and_hms_opt(hour, minute, 0)
                    .unwrap(),
                latitude,
                longitude,
                injured_persons: persons,
                injured_pedestrians: None,
                injured_cyclists: cyclists,
                injured_motorists: None,
                on_street_name: street.map(str::to_string),
                extra: BTreeMap::new(),
            },
        )
}

fn table_strategy() -> impl Strategy<Value = CollisionTable> {
    proptest::collection::vec(record_strategy(), 0..80).prop_map(|records| CollisionTable {
        records,
        columns: vec!["date/time".into()],
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn raising_the_threshold_never_adds_hotspots(
        table in table_strategy(),
        t1 in 0u32..=20,
    ) {
        let t2 = (t1 + 1).min(20);
        let wide = injury_hotspots(&table, t1);
        let narrow = injury_hotspots(&table, t2);

        prop_assert!(narrow.len() <= wide.len());
        for point in &narrow {
            prop_assert!(wide.contains(point));
        }
    }

    #[test]
    fn histogram_conserves_the_hour_window(
        table in table_strategy(),
        hour in 0u32..=24,
    ) {
        let view = by_hour(&table, hour);
        let hist = minute_histogram(&view);

        prop_assert_eq!(hist.len(), 60);
        prop_assert_eq!(hist.iter().sum::<u32>() as usize, view.len());
    }

    #[test]
    fn hourly_view_matches_only_its_hour(
        table in table_strategy(),
        hour in 0u32..=24,
    ) {
        use chrono::Timelike;
        let view = by_hour(&table, hour);
        for rec in &view.records {
            prop_assert_eq!(rec.timestamp.hour(), hour);
        }
        // Centroid exists exactly when the view is non-empty.
        prop_assert_eq!(view.centroid.is_some(), !view.is_empty());
    }

    #[test]
    fn hour_24_matches_nothing(table in table_strategy()) {
        let view = by_hour(&table, 24);
        prop_assert!(view.is_empty());
        prop_assert!(view.centroid.is_none());
    }

    #[test]
    fn ranking_respects_limit_floor_and_order(
        table in table_strategy(),
        limit in 0usize..10,
    ) {
        let ranking = top_affected(&table, Category::Cyclists, limit);

        prop_assert!(ranking.len() <= limit);
        for pair in ranking.windows(2) {
            prop_assert!(pair[0].injured >= pair[1].injured);
        }
        for entry in &ranking {
            prop_assert!(entry.injured >= 1);
            prop_assert!(!entry.street.is_empty());
        }
    }
}
