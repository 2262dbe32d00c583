//! End-to-end test: a raw CSV export goes through the cache and every
//! derivation a dashboard would render.

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use crashboard::{
    by_hour, injury_hotspots, minute_histogram, top_affected, Category, TableCache,
    DEFAULT_RANKING_LIMIT, TIMESTAMP_COLUMN,
};

fn export_fixture() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(
        file,
        "CRASH_DATE,CRASH_TIME,BOROUGH,LATITUDE,LONGITUDE,INJURED_PERSONS,\
INJURED_PEDESTRIANS,INJURED_CYCLISTS,INJURED_MOTORISTS,ON_STREET_NAME"
    )
    .unwrap();
    // A typical slice of the export: mixed casing handled by the loader,
    // one row without coordinates, one without a street.
    let rows = [
        "03/26/2019,08:12,BROOKLYN,40.6782,-73.9442,1,1,0,0,ATLANTIC AVE",
        "03/26/2019,08:47,BROOKLYN,40.6790,-73.9440,0,0,0,0,ATLANTIC AVE",
        "03/26/2019,08:59,MANHATTAN,40.7128,-74.0060,4,0,1,3,BROADWAY",
        "03/26/2019,09:03,MANHATTAN,,,2,2,0,0,BROADWAY",
        "03/26/2019,17:30,QUEENS,40.7420,-73.8800,6,0,2,4,",
        "03/27/2019,08:05,BRONX,40.8448,-73.8648,2,2,0,0,GRAND CONCOURSE",
    ];
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn csv_export_drives_every_dashboard_view() {
    let file = export_fixture();
    let cache = TableCache::new(file.path());

    let table = cache.load(10_000).unwrap();

    // The row without coordinates is gone; the schema is normalized.
    assert_eq!(table.len(), 5);
    assert_eq!(table.columns[0], TIMESTAMP_COLUMN);
    assert!(table.columns.contains(&"borough".to_string()));

    // Hotspot map: threshold 2 keeps the three multi-injury crashes.
    let hotspots = injury_hotspots(&table, 2);
    assert_eq!(hotspots.len(), 3);

    // Hour 8 view: four crashes across two days, centered in the city.
    let view = by_hour(&table, 8);
    assert_eq!(view.len(), 4);
    let center = view.centroid.unwrap();
    assert!((40.6..41.0).contains(&center.latitude));
    assert!((-74.1..-73.8).contains(&center.longitude));

    // Histogram: one crash each at :12, :47, :59, :05 of hour 8.
    let hist = minute_histogram(&view);
    assert_eq!(hist.iter().sum::<u32>(), 4);
    assert_eq!(hist[12], 1);
    assert_eq!(hist[47], 1);
    assert_eq!(hist[5], 1);

    // Ranking reads the base table: the 17:30 crash (no street) is
    // excluded, motorists rank BROADWAY over GRAND CONCOURSE.
    let ranking = top_affected(&table, Category::Motorists, DEFAULT_RANKING_LIMIT);
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0].street, "BROADWAY");
    assert_eq!(ranking[0].injured, 3);

    // A second load for the same limit is the cached table.
    let again = cache.load(10_000).unwrap();
    assert!(Arc::ptr_eq(&table, &again));
}
