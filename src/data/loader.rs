use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use chrono::NaiveDateTime;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, CollisionRecord, CollisionTable};

/// Canonical name of the merged crash date + crash time column.
pub const TIMESTAMP_COLUMN: &str = "date/time";

const DATE_COLUMN: &str = "crash_date";
const TIME_COLUMN: &str = "crash_time";
const LATITUDE_COLUMN: &str = "latitude";
const LONGITUDE_COLUMN: &str = "longitude";

/// Typed columns pulled out of the passthrough map.
const KNOWN_COLUMNS: [&str; 9] = [
    DATE_COLUMN,
    TIME_COLUMN,
    LATITUDE_COLUMN,
    LONGITUDE_COLUMN,
    "injured_persons",
    "injured_pedestrians",
    "injured_cyclists",
    "injured_motorists",
    "on_street_name",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to produce a [`CollisionTable`] from the source file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Source file missing or unreadable.
    #[error("source not found: {path}: {source}")]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required date/time or coordinate column is absent.
    #[error("source schema: {0}")]
    Schema(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load up to `max_rows` collision records from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – the canonical open-data export (recommended)
/// * `.json`    – `[{ "crash_date": ..., "latitude": ..., ... }, ...]`
/// * `.parquet` – same logical columns as the CSV
///
/// Whatever the format, loading
/// 1. reads at most `max_rows` source rows,
/// 2. merges the crash date and crash time cells into one timestamp,
/// 3. drops every row missing latitude, longitude, or a parsable timestamp,
/// 4. lowercases column names and exposes the merged column as
///    [`TIMESTAMP_COLUMN`].
pub fn load_file(path: &Path, max_rows: usize) -> Result<CollisionTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (table, scanned) = match ext.as_str() {
        "csv" => load_csv(path, max_rows)?,
        "json" => load_json(path, max_rows)?,
        "parquet" | "pq" => load_parquet(path, max_rows)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string())),
    };

    info!(
        "loaded {} of {} rows from {} ({} dropped as incomplete)",
        table.len(),
        scanned,
        path.display(),
        scanned - table.len(),
    );
    Ok(table)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Shared row assembly
// ---------------------------------------------------------------------------

/// One source row before cleaning, fields still optional.
#[derive(Default)]
struct RawRow {
    date: Option<String>,
    time: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    injured_persons: Option<u32>,
    injured_pedestrians: Option<u32>,
    injured_cyclists: Option<u32>,
    injured_motorists: Option<u32>,
    on_street_name: Option<String>,
    extra: BTreeMap<String, CellValue>,
}

impl RawRow {
    /// Clean the row: merge date + time, require finite coordinates.
    /// `None` means the row is dropped.
    fn finish(self) -> Option<CollisionRecord> {
        let timestamp = parse_timestamp(self.date.as_deref()?, self.time.as_deref()?)?;
        let latitude = self.latitude.filter(|v| v.is_finite())?;
        let longitude = self.longitude.filter(|v| v.is_finite())?;

        Some(CollisionRecord {
            timestamp,
            latitude,
            longitude,
            injured_persons: self.injured_persons,
            injured_pedestrians: self.injured_pedestrians,
            injured_cyclists: self.injured_cyclists,
            injured_motorists: self.injured_motorists,
            on_street_name: self.on_street_name,
            extra: self.extra,
        })
    }
}

/// Lowercase a source header and map spaces to underscores, so
/// `CRASH DATE` and `CRASH_DATE` both resolve to `crash_date`.
fn normalize_header(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(' ', "_")
}

/// Parse the merged `"<date> <time>"` string. Accepts the open-data export
/// format (`03/26/2019 14:30`) and ISO (`2019-03-26 14:30:00`), with or
/// without seconds.
fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let merged = format!("{} {}", date.trim(), time.trim());
    const FORMATS: [&str; 4] = [
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&merged, fmt).ok())
}

/// Parse an injury-count cell. The export writes counts as integers or as
/// floats with a zero fraction (`"2"`, `"2.0"`); anything else is missing.
fn parse_count(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    if f >= 0.0 && f.fract() == 0.0 {
        Some(f as u32)
    } else {
        None
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// The normalized output column list: the merged timestamp first, then every
/// source column except the two that were merged, in source order.
fn output_columns(normalized_headers: &[String]) -> Vec<String> {
    let mut columns = vec![TIMESTAMP_COLUMN.to_string()];
    columns.extend(
        normalized_headers
            .iter()
            .filter(|h| h.as_str() != DATE_COLUMN && h.as_str() != TIME_COLUMN)
            .cloned(),
    );
    columns
}

fn require_column(headers: &[String], name: &str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| LoadError::Schema(format!("missing required column '{name}'")))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names in any casing; one collision per
/// row. Empty cells are missing values.
fn load_csv(path: &Path, max_rows: usize) -> Result<(CollisionTable, usize), LoadError> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

    let date_idx = require_column(&headers, DATE_COLUMN)?;
    let time_idx = require_column(&headers, TIME_COLUMN)?;
    let lat_idx = require_column(&headers, LATITUDE_COLUMN)?;
    let lon_idx = require_column(&headers, LONGITUDE_COLUMN)?;
    let col_idx = |name: &str| headers.iter().position(|h| h == name);

    let persons_idx = col_idx("injured_persons");
    let pedestrians_idx = col_idx("injured_pedestrians");
    let cyclists_idx = col_idx("injured_cyclists");
    let motorists_idx = col_idx("injured_motorists");
    let street_idx = col_idx("on_street_name");

    let mut scanned = 0;
    let mut records = Vec::new();

    for result in reader.records().take(max_rows) {
        let record = result?;
        scanned += 1;

        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");
        let mut raw = RawRow {
            date: non_empty(cell(Some(date_idx))),
            time: non_empty(cell(Some(time_idx))),
            latitude: cell(Some(lat_idx)).trim().parse::<f64>().ok(),
            longitude: cell(Some(lon_idx)).trim().parse::<f64>().ok(),
            injured_persons: parse_count(cell(persons_idx)),
            injured_pedestrians: parse_count(cell(pedestrians_idx)),
            injured_cyclists: parse_count(cell(cyclists_idx)),
            injured_motorists: parse_count(cell(motorists_idx)),
            on_street_name: non_empty(cell(street_idx)),
            ..RawRow::default()
        };

        for (i, value) in record.iter().enumerate() {
            let name = &headers[i];
            if KNOWN_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            raw.extra.insert(name.clone(), CellValue::from_text(value));
        }

        if let Some(rec) = raw.finish() {
            records.push(rec);
        }
    }

    let columns = output_columns(&headers);
    Ok((CollisionTable { records, columns }, scanned))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "crash_date": "03/26/2019",
///     "crash_time": "14:30",
///     "latitude": 40.71,
///     "longitude": -73.99,
///     "injured_persons": 2,
///     "on_street_name": "BROADWAY"
///   },
///   ...
/// ]
/// ```
///
/// Keys are normalized the same way as CSV headers.
fn load_json(path: &Path, max_rows: usize) -> Result<(CollisionTable, usize), LoadError> {
    let mut text = String::new();
    open(path)?
        .read_to_string(&mut text)
        .map_err(|source| LoadError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let rows = root
        .as_array()
        .ok_or_else(|| LoadError::Schema("expected top-level JSON array".into()))?;

    // Column order and the required-column check both come from the first
    // record.
    let mut headers: Vec<String> = Vec::new();
    if let Some(first) = rows.first() {
        let obj = first
            .as_object()
            .ok_or_else(|| LoadError::Schema("expected an array of JSON objects".into()))?;
        headers = obj.keys().map(|k| normalize_header(k)).collect();
        for required in [DATE_COLUMN, TIME_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN] {
            require_column(&headers, required)?;
        }
    }

    let mut scanned = 0;
    let mut records = Vec::new();

    for row in rows.iter().take(max_rows) {
        let Some(obj) = row.as_object() else {
            scanned += 1;
            continue;
        };
        scanned += 1;

        let mut raw = RawRow::default();
        for (key, value) in obj {
            let name = normalize_header(key);
            match name.as_str() {
                DATE_COLUMN => raw.date = json_to_text(value),
                TIME_COLUMN => raw.time = json_to_text(value),
                LATITUDE_COLUMN => raw.latitude = value.as_f64(),
                LONGITUDE_COLUMN => raw.longitude = value.as_f64(),
                "injured_persons" => raw.injured_persons = json_to_count(value),
                "injured_pedestrians" => raw.injured_pedestrians = json_to_count(value),
                "injured_cyclists" => raw.injured_cyclists = json_to_count(value),
                "injured_motorists" => raw.injured_motorists = json_to_count(value),
                "on_street_name" => {
                    raw.on_street_name = json_to_text(value).and_then(|s| non_empty(&s))
                }
                _ => {
                    raw.extra.insert(name.clone(), json_to_cell(value));
                }
            }
        }

        if let Some(rec) = raw.finish() {
            records.push(rec);
        }
    }

    let columns = output_columns(&headers);
    Ok((CollisionTable { records, columns }, scanned))
}

fn json_to_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => non_empty(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_to_count(val: &JsonValue) -> Option<u32> {
    match val {
        JsonValue::Number(_) => {
            let f = val.as_f64()?;
            if f >= 0.0 && f.fract() == 0.0 {
                Some(f as u32)
            } else {
                None
            }
        }
        JsonValue::String(s) => parse_count(s),
        _ => None,
    }
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet export with the same logical columns as the CSV. Date and
/// time columns are Utf8; coordinates Float64/Float32; counts any integer or
/// float type. Works with files written by both Pandas and Polars.
fn load_parquet(path: &Path, max_rows: usize) -> Result<(CollisionTable, usize), LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let reader = builder.build()?;

    let mut headers: Vec<String> = Vec::new();
    let mut scanned = 0;
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        if headers.is_empty() {
            headers = schema
                .fields()
                .iter()
                .map(|f| normalize_header(f.name()))
                .collect();
            for required in [DATE_COLUMN, TIME_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN] {
                require_column(&headers, required)?;
            }
        }

        let col = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .map(|i| batch.column(i))
        };
        // Checked above.
        let date_col = col(DATE_COLUMN).unwrap();
        let time_col = col(TIME_COLUMN).unwrap();
        let lat_col = col(LATITUDE_COLUMN).unwrap();
        let lon_col = col(LONGITUDE_COLUMN).unwrap();
        let persons_col = col("injured_persons");
        let pedestrians_col = col("injured_pedestrians");
        let cyclists_col = col("injured_cyclists");
        let motorists_col = col("injured_motorists");
        let street_col = col("on_street_name");

        let extra_cols: Vec<(usize, &String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !KNOWN_COLUMNS.contains(&name.as_str()))
            .map(|(i, name)| (i, name))
            .collect();

        for row in 0..batch.num_rows() {
            if scanned >= max_rows {
                break;
            }
            scanned += 1;

            let count_at =
                |c: Option<&Arc<dyn Array>>| c.and_then(|c| extract_f64(c, row)).and_then(|f| {
                    if f >= 0.0 && f.fract() == 0.0 {
                        Some(f as u32)
                    } else {
                        None
                    }
                });

            let mut raw = RawRow {
                date: extract_string(date_col, row),
                time: extract_string(time_col, row),
                latitude: extract_f64(lat_col, row),
                longitude: extract_f64(lon_col, row),
                injured_persons: count_at(persons_col),
                injured_pedestrians: count_at(pedestrians_col),
                injured_cyclists: count_at(cyclists_col),
                injured_motorists: count_at(motorists_col),
                on_street_name: street_col
                    .and_then(|c| extract_string(c, row))
                    .and_then(|s| non_empty(&s)),
                ..RawRow::default()
            };

            for (col_idx, name) in &extra_cols {
                raw.extra
                    .insert((*name).clone(), extract_cell_value(batch.column(*col_idx), row));
            }

            if let Some(rec) = raw.finish() {
                records.push(rec);
            }
        }

        if scanned >= max_rows {
            break;
        }
    }

    let columns = output_columns(&headers);
    Ok((CollisionTable { records, columns }, scanned))
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row)),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row) as f64),
        _ => None,
    }
}

/// Extract a single passthrough value from an Arrow column at a given row.
fn extract_cell_value(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            extract_string(col, row).map_or(CellValue::Null, CellValue::String)
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            CellValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            CellValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            CellValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            CellValue::Bool(arr.value(row))
        }
        _ => CellValue::String(format!("{:?}", col.data_type())),
    }
}
