//! Headless data core for an interactive vehicle-collision dashboard.
//!
//! The crate loads a tabular export of collision records, cleans it into an
//! immutable in-memory table (cached per row-count limit), and derives the
//! views a dashboard displays: a hotspot coordinate list, an hour-of-day
//! subset with its map centroid, a per-minute histogram, and a top-streets
//! ranking. Rendering is the caller's job; nothing here draws anything.

pub mod data;
pub mod session;

pub use data::cache::TableCache;
pub use data::filter::{
    by_hour, centroid, injury_hotspots, minute_histogram, top_affected, Coordinate, HourlyView,
    StreetRanking, DEFAULT_RANKING_LIMIT, MAX_HOUR, MAX_INJURY_THRESHOLD,
};
pub use data::loader::{load_file, LoadError, TIMESTAMP_COLUMN};
pub use data::model::{Category, CellValue, CollisionRecord, CollisionTable};
pub use session::{DashboardSession, Params};
