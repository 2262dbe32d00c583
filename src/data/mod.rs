/// Data layer: core types, loading, caching, and the derived views.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read ≤ max_rows → merge date/time → drop rows
///   └──────────┘  without coordinates → lowercase columns
///        │
///        ▼
///   ┌────────────────┐
///   │ CollisionTable  │  immutable; one per row-count limit
///   └────────────────┘
///        │ (cache: max_rows → Arc<CollisionTable>)
///        ▼
///   ┌──────────┐
///   │  filter   │  hotspot map · hourly view + centroid
///   └──────────┘  · minute histogram · street ranking
/// ```
pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
