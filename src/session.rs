use std::path::Path;
use std::sync::Arc;

use crate::data::cache::TableCache;
use crate::data::filter::{
    by_hour, injury_hotspots, minute_histogram, top_affected, Coordinate, HourlyView,
    StreetRanking, DEFAULT_RANKING_LIMIT,
};
use crate::data::loader::LoadError;
use crate::data::model::{Category, CollisionTable};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The parameter set a presentation layer controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Row-count limit handed to the loader (cache key).
    pub max_rows: usize,
    /// Injury threshold for the hotspot map, 0..=20.
    pub injury_threshold: u32,
    /// Hour-of-day for the hourly view, 0..=24.
    pub hour: u32,
    /// Affected-person category for the street ranking.
    pub category: Category,
}

impl Default for Params {
    fn default() -> Self {
        // The defaults the original dashboard starts with.
        Self {
            max_rows: 10_000,
            injury_threshold: 0,
            hour: 0,
            category: Category::Pedestrians,
        }
    }
}

/// One interactive session over a collision source file, independent of
/// rendering.
///
/// Owns the table cache and the current [`Params`], and keeps every derived
/// view current: each setter re-derives only what depends on the changed
/// parameter, mirroring the widget → recompute → display loop of the
/// dashboard this core serves. Single-threaded, synchronous.
pub struct DashboardSession {
    cache: TableCache,
    params: Params,
    table: Option<Arc<CollisionTable>>,
    hotspots: Vec<Coordinate>,
    hourly: HourlyView,
    histogram: [u32; 60],
    ranking: Vec<StreetRanking>,
}

impl DashboardSession {
    /// Create a session reading from `source`. Nothing is loaded until
    /// [`refresh`](Self::refresh) (or a row-count change) runs.
    pub fn new(source: impl AsRef<Path>) -> Self {
        Self {
            cache: TableCache::new(source.as_ref()),
            params: Params::default(),
            table: None,
            hotspots: Vec::new(),
            hourly: HourlyView {
                hour: Params::default().hour,
                records: Vec::new(),
                centroid: None,
            },
            histogram: [0; 60],
            ranking: Vec::new(),
        }
    }

    /// Load (or fetch from cache) the table for the current row count and
    /// re-derive every view.
    pub fn refresh(&mut self) -> Result<(), LoadError> {
        let table = self.cache.load(self.params.max_rows)?;
        self.table = Some(table);
        self.rederive_hotspots();
        self.rederive_hourly();
        self.rederive_ranking();
        Ok(())
    }

    // ---- Parameter changes ----

    /// Change the row-count limit. Reloads (cached per row count) and
    /// re-derives everything.
    pub fn set_max_rows(&mut self, max_rows: usize) -> Result<(), LoadError> {
        self.params.max_rows = max_rows;
        self.refresh()
    }

    /// Change the injury threshold; only the hotspot map depends on it.
    pub fn set_injury_threshold(&mut self, threshold: u32) {
        self.params.injury_threshold = threshold;
        self.rederive_hotspots();
    }

    /// Change the hour; the hourly view and the minute histogram depend on
    /// it. The street ranking deliberately does not.
    pub fn set_hour(&mut self, hour: u32) {
        self.params.hour = hour;
        self.rederive_hourly();
    }

    /// Change the ranking category; only the street ranking depends on it.
    pub fn set_category(&mut self, category: Category) {
        self.params.category = category;
        self.rederive_ranking();
    }

    // ---- Current views ----

    pub fn params(&self) -> Params {
        self.params
    }

    /// The unfiltered base table, once loaded.
    pub fn table(&self) -> Option<&Arc<CollisionTable>> {
        self.table.as_ref()
    }

    /// Map points for the current injury threshold.
    pub fn hotspots(&self) -> &[Coordinate] {
        &self.hotspots
    }

    /// Hour-filtered view (records + map centroid) for the current hour.
    pub fn hourly(&self) -> &HourlyView {
        &self.hourly
    }

    /// Minute histogram over the current hour window.
    pub fn histogram(&self) -> &[u32; 60] {
        &self.histogram
    }

    /// Street ranking for the current category, from the base table.
    pub fn ranking(&self) -> &[StreetRanking] {
        &self.ranking
    }

    // ---- Derivations ----

    fn rederive_hotspots(&mut self) {
        if let Some(table) = &self.table {
            self.hotspots = injury_hotspots(table, self.params.injury_threshold);
        }
    }

    fn rederive_hourly(&mut self) {
        if let Some(table) = &self.table {
            self.hourly = by_hour(table, self.params.hour);
            self.histogram = minute_histogram(&self.hourly);
        }
    }

    fn rederive_ranking(&mut self) {
        if let Some(table) = &self.table {
            self.ranking = top_affected(table, self.params.category, DEFAULT_RANKING_LIMIT);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn sample_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "CRASH_DATE,CRASH_TIME,LATITUDE,LONGITUDE,INJURED_PERSONS,\
INJURED_PEDESTRIANS,INJURED_CYCLISTS,INJURED_MOTORISTS,ON_STREET_NAME"
        )
        .unwrap();
        writeln!(file, "03/26/2019,09:15,40.70,-73.90,3,1,0,2,BROADWAY").unwrap();
        writeln!(file, "03/26/2019,09:45,40.72,-73.92,0,0,0,0,BROADWAY").unwrap();
        writeln!(file, "03/26/2019,17:05,40.75,-73.95,5,0,4,1,QUEENS BLVD").unwrap();
        writeln!(file, "03/27/2019,09:15,40.71,-73.91,1,1,0,0,5TH AVE").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn refresh_populates_every_view() {
        let file = sample_csv();
        let mut session = DashboardSession::new(file.path());
        assert!(session.table().is_none());

        session.refresh().unwrap();

        assert_eq!(session.table().unwrap().len(), 4);
        assert_eq!(session.hotspots().len(), 4); // threshold 0
        assert_eq!(session.hourly().len(), 0); // hour 0
        assert_eq!(session.ranking().len(), 2); // pedestrians on two streets
    }

    #[test]
    fn each_setter_touches_only_its_view() {
        let file = sample_csv();
        let mut session = DashboardSession::new(file.path());
        session.refresh().unwrap();
        let table_before = Arc::clone(session.table().unwrap());

        session.set_injury_threshold(3);
        assert_eq!(session.hotspots().len(), 2);

        session.set_hour(9);
        assert_eq!(session.hourly().len(), 3);
        assert_eq!(session.histogram().iter().sum::<u32>(), 3);
        assert!(session.hourly().centroid.is_some());

        session.set_category(Category::Cyclists);
        assert_eq!(session.ranking().len(), 1);
        assert_eq!(session.ranking()[0].street, "QUEENS BLVD");

        // None of the above reloads: the hour filter never replaces the
        // base table the ranking reads.
        assert!(Arc::ptr_eq(&table_before, session.table().unwrap()));
        assert_eq!(session.table().unwrap().len(), 4);
    }

    #[test]
    fn changing_row_count_reloads_through_the_cache() {
        let file = sample_csv();
        let mut session = DashboardSession::new(file.path());
        session.refresh().unwrap();
        assert_eq!(session.table().unwrap().len(), 4);

        session.set_max_rows(2).unwrap();
        assert_eq!(session.table().unwrap().len(), 2);

        session.set_max_rows(10_000).unwrap();
        assert_eq!(session.table().unwrap().len(), 4);
    }

    #[test]
    fn missing_source_surfaces_the_load_error() {
        let mut session = DashboardSession::new("/nonexistent/collisions.csv");
        assert!(matches!(
            session.refresh(),
            Err(LoadError::SourceNotFound { .. })
        ));
    }
}
