use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single passthrough cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell for source columns the core does not interpret
/// (borough, zip code, vehicle types, ...). They ride along under their
/// normalized column names so a raw-data view can still show them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Parse a raw text cell into the narrowest matching type.
    pub fn from_text(s: &str) -> CellValue {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Category – which kind of road user a ranking looks at
// ---------------------------------------------------------------------------

/// The affected-person category selectable in the street ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Pedestrians,
    Cyclists,
    Motorists,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Pedestrians,
        Category::Cyclists,
        Category::Motorists,
    ];

    /// The normalized source column carrying this category's injury count.
    pub fn column_name(self) -> &'static str {
        match self {
            Category::Pedestrians => "injured_pedestrians",
            Category::Cyclists => "injured_cyclists",
            Category::Motorists => "injured_motorists",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Pedestrians => write!(f, "Pedestrians"),
            Category::Cyclists => write!(f, "Cyclists"),
            Category::Motorists => write!(f, "Motorists"),
        }
    }
}

// ---------------------------------------------------------------------------
// CollisionRecord – one cleaned row
// ---------------------------------------------------------------------------

/// A single collision (one cleaned row of the source table).
///
/// Rows missing latitude or longitude never survive loading, so the
/// coordinates are plain `f64` here. Injury counts stay optional: a missing
/// count means "unknown", not zero, and the filter layer excludes such rows
/// rather than defaulting them.
#[derive(Debug, Clone, Serialize)]
pub struct CollisionRecord {
    /// Merged crash date + crash time.
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    /// Total injured, all road users.
    pub injured_persons: Option<u32>,
    pub injured_pedestrians: Option<u32>,
    pub injured_cyclists: Option<u32>,
    pub injured_motorists: Option<u32>,
    /// Street the collision occurred on, when recorded.
    pub on_street_name: Option<String>,
    /// Uninterpreted source columns: normalized name → value.
    pub extra: BTreeMap<String, CellValue>,
}

impl CollisionRecord {
    /// Injury count for the given category (`None` when the source cell is
    /// missing).
    pub fn injured_in(&self, category: Category) -> Option<u32> {
        match category {
            Category::Pedestrians => self.injured_pedestrians,
            Category::Cyclists => self.injured_cyclists,
            Category::Motorists => self.injured_motorists,
        }
    }
}

// ---------------------------------------------------------------------------
// CollisionTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full cleaned dataset for one row-count limit.
///
/// Immutable once built: every filter derives a new view, and the street
/// ranking always reads this table rather than any hour-filtered subset.
#[derive(Debug, Clone, Serialize)]
pub struct CollisionTable {
    /// All retained records, in source order.
    pub records: Vec<CollisionRecord>,
    /// Normalized column names in source order. The merged timestamp column
    /// comes first under its canonical name `date/time`, so consumers see a
    /// stable schema regardless of source header casing.
    pub columns: Vec<String>,
}

impl CollisionTable {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
