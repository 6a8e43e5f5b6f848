//! In-situ observation table.
//!
//! Loaded once at startup from a pickle file holding either a list of
//! records (dicts) or a dict of equal-length columns. Rows missing a
//! variable, a parseable date, or a finite lat/lon/value are dropped.
//! The table is immutable after loading.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_pickle::{DeOptions, HashableValue, Value};
use thiserror::Error;
use tracing::{info, instrument};

use raster_common::DATE_FORMAT;

const VARIABLE_COLUMNS: &[&str] = &["variable", "parameter"];
const DATE_COLUMNS: &[&str] = &["date", "datetime", "time"];
const LAT_COLUMNS: &[&str] = &["lat", "latitude"];
const LON_COLUMNS: &[&str] = &["lon", "longitude", "lng"];
const VALUE_COLUMNS: &[&str] = &["value"];

#[derive(Error, Debug)]
pub enum InsituError {
    #[error("failed to fetch in-situ data from {source_ref}: {message}")]
    Fetch { source_ref: String, message: String },

    #[error("failed to decode in-situ pickle: {0}")]
    Decode(String),

    #[error("unsupported in-situ table layout: {0}")]
    Layout(String),
}

/// One cleaned observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
    pub date: String,
}

/// A raw row before cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsituRecord {
    pub variable: Option<String>,
    pub date: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub value: Option<f64>,
}

impl InsituRecord {
    fn clean(self) -> Option<(String, Observation)> {
        let variable = self.variable.filter(|v| !v.trim().is_empty())?;
        let date = normalize_date(self.date.as_deref()?)?;
        let (lat, lon, value) = (self.lat?, self.lon?, self.value?);
        if !(lat.is_finite() && lon.is_finite() && value.is_finite()) {
            return None;
        }
        Some((
            variable.trim().to_string(),
            Observation {
                lat,
                lon,
                value,
                date,
            },
        ))
    }
}

/// Observations indexed by variable, then by `YYYY-MM-DD` date.
#[derive(Debug, Clone, Default)]
pub struct InsituTable {
    by_variable: HashMap<String, BTreeMap<String, Vec<Observation>>>,
    rows: usize,
}

impl InsituTable {
    /// Build from raw records, dropping incomplete rows.
    pub fn from_records(records: impl IntoIterator<Item = InsituRecord>) -> Self {
        let mut table = Self::default();
        for (variable, observation) in records.into_iter().filter_map(InsituRecord::clean) {
            table
                .by_variable
                .entry(variable)
                .or_default()
                .entry(observation.date.clone())
                .or_default()
                .push(observation);
            table.rows += 1;
        }
        table
    }

    /// Decode a pickled list of records or dict of columns.
    pub fn from_pickle(bytes: &[u8]) -> Result<Self, InsituError> {
        let value = serde_pickle::value_from_slice(bytes, DeOptions::new())
            .map_err(|e| InsituError::Decode(e.to_string()))?;

        let records = match value {
            Value::List(rows) | Value::Tuple(rows) => rows
                .iter()
                .map(record_from_row)
                .collect::<Result<Vec<_>, _>>()?,
            Value::Dict(columns) => records_from_columns(&columns)?,
            other => {
                return Err(InsituError::Layout(format!(
                    "expected a list of records or a dict of columns, got {}",
                    kind(&other)
                )))
            }
        };

        let total = records.len();
        let table = Self::from_records(records);
        info!(
            rows = table.len(),
            dropped = total - table.len(),
            variables = ?table.variables(),
            "Loaded in-situ table"
        );
        Ok(table)
    }

    /// Fetch and decode from an HTTP(S) URL or local path.
    #[instrument(skip(timeout))]
    pub async fn load(source: &str, timeout: Duration) -> Result<Self, InsituError> {
        let fetch_err = |message: String| InsituError::Fetch {
            source_ref: source.to_string(),
            message,
        };

        let bytes = if source.starts_with("http://") || source.starts_with("https://") {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| fetch_err(e.to_string()))?;
            client
                .get(source)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| fetch_err(e.to_string()))?
                .bytes()
                .await
                .map_err(|e| fetch_err(e.to_string()))?
                .to_vec()
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            tokio::fs::read(path)
                .await
                .map_err(|e| fetch_err(e.to_string()))?
        };

        tokio::task::spawn_blocking(move || Self::from_pickle(&bytes))
            .await
            .map_err(|e| InsituError::Decode(e.to_string()))?
    }

    /// Observations of `variable` on `date` (`YYYY-MM-DD`).
    pub fn observations(&self, variable: &str, date: &str) -> &[Observation] {
        self.by_variable
            .get(variable)
            .and_then(|dates| dates.get(date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sorted distinct dates with observations of `variable`.
    pub fn available_dates(&self, variable: &str) -> Vec<String> {
        self.by_variable
            .get(variable)
            .map(|dates| dates.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_variable.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Normalise a date or timestamp string to `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })?;
    Some(date.format(DATE_FORMAT).to_string())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::None => "None",
        Value::Bool(_) => "bool",
        Value::I64(_) | Value::Int(_) => "int",
        Value::F64(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Set(_) | Value::FrozenSet(_) => "set",
        Value::Dict(_) => "dict",
    }
}

fn key_name(key: &HashableValue) -> Option<&str> {
    match key {
        HashableValue::String(s) => Some(s.as_str()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::F64(v) => Some(*v),
        Value::I64(v) => Some(*v as f64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bytes(b) => String::from_utf8(b.clone()).ok(),
        _ => None,
    }
}

fn lookup<'a, T>(map: &'a BTreeMap<HashableValue, T>, names: &[&str]) -> Option<&'a T> {
    map.iter()
        .find(|(k, _)| key_name(k).is_some_and(|k| names.iter().any(|n| k.eq_ignore_ascii_case(n))))
        .map(|(_, v)| v)
}

fn record_from_row(row: &Value) -> Result<InsituRecord, InsituError> {
    let Value::Dict(fields) = row else {
        return Err(InsituError::Layout(format!(
            "record must be a dict, got {}",
            kind(row)
        )));
    };

    Ok(InsituRecord {
        variable: lookup(fields, VARIABLE_COLUMNS).and_then(as_string),
        date: lookup(fields, DATE_COLUMNS).and_then(as_string),
        lat: lookup(fields, LAT_COLUMNS).and_then(as_f64),
        lon: lookup(fields, LON_COLUMNS).and_then(as_f64),
        value: lookup(fields, VALUE_COLUMNS).and_then(as_f64),
    })
}

fn records_from_columns(
    columns: &BTreeMap<HashableValue, Value>,
) -> Result<Vec<InsituRecord>, InsituError> {
    let column = |names: &[&str]| -> Result<&[Value], InsituError> {
        match lookup(columns, names) {
            Some(Value::List(values)) | Some(Value::Tuple(values)) => Ok(values.as_slice()),
            Some(other) => Err(InsituError::Layout(format!(
                "column {} must be a list, got {}",
                names[0],
                kind(other)
            ))),
            None => Err(InsituError::Layout(format!("missing column {}", names[0]))),
        }
    };

    let variables = column(VARIABLE_COLUMNS)?;
    let dates = column(DATE_COLUMNS)?;
    let lats = column(LAT_COLUMNS)?;
    let lons = column(LON_COLUMNS)?;
    let values = column(VALUE_COLUMNS)?;

    let len = variables.len();
    if [dates.len(), lats.len(), lons.len(), values.len()]
        .iter()
        .any(|l| *l != len)
    {
        return Err(InsituError::Layout("columns differ in length".to_string()));
    }

    Ok((0..len)
        .map(|i| InsituRecord {
            variable: as_string(&variables[i]),
            date: as_string(&dates[i]),
            lat: as_f64(&lats[i]),
            lon: as_f64(&lons[i]),
            value: as_f64(&values[i]),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serde_pickle::SerOptions;

    fn pickle(value: &serde_json::Value) -> Vec<u8> {
        serde_pickle::to_vec(value, SerOptions::new()).unwrap()
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-06-01").as_deref(), Some("2024-06-01"));
        assert_eq!(normalize_date("2024-06-01 13:45:00").as_deref(), Some("2024-06-01"));
        assert_eq!(normalize_date("2024-06-01T13:45:00.5").as_deref(), Some("2024-06-01"));
        assert_eq!(normalize_date("2024-06-01T13:45:00Z").as_deref(), Some("2024-06-01"));
        assert_eq!(normalize_date("06/01/2024"), None);
    }

    #[test]
    fn test_records_layout_with_cleaning() {
        let bytes = pickle(&json!([
            {"variable": "chl", "date": "2024-06-01", "lat": 41.1, "lon": -72.9, "value": 3.2},
            {"variable": "chl", "date": "2024-06-01 09:00:00", "lat": 41.2, "lon": -72.8, "value": 4},
            {"variable": "chl", "date": "2024-06-03", "lat": 41.2, "lon": -72.8, "value": null},
            {"variable": "chl", "date": "not a date", "lat": 41.2, "lon": -72.8, "value": 1.0},
            {"variable": "tsm", "date": "2024-05-30", "latitude": 41.0, "longitude": -73.0, "value": 7.5}
        ]));
        let table = InsituTable::from_pickle(&bytes).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.variables(), vec!["chl", "tsm"]);
        let obs = table.observations("chl", "2024-06-01");
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].value, 4.0);
        assert_eq!(table.available_dates("chl"), vec!["2024-06-01"]);
        assert_eq!(table.available_dates("tsm"), vec!["2024-05-30"]);
        assert!(table.observations("chl", "2024-06-03").is_empty());
        assert!(table.available_dates("kd490").is_empty());
    }

    #[test]
    fn test_columns_layout() {
        let bytes = pickle(&json!({
            "variable": ["chl", "chl", "chl"],
            "date": ["2024-06-02", "2024-06-01", "2024-06-02"],
            "lat": [41.0, 41.1, 41.2],
            "lon": [-73.0, -72.9, -72.8],
            "value": [1.0, 2.0, 3.0]
        }));
        let table = InsituTable::from_pickle(&bytes).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.available_dates("chl"), vec!["2024-06-01", "2024-06-02"]);
        assert_eq!(table.observations("chl", "2024-06-02").len(), 2);
    }

    #[test]
    fn test_bad_layouts() {
        assert!(matches!(
            InsituTable::from_pickle(&pickle(&json!(42))),
            Err(InsituError::Layout(_))
        ));
        assert!(matches!(
            InsituTable::from_pickle(&pickle(&json!({"variable": ["chl"], "date": ["2024-01-01"]}))),
            Err(InsituError::Layout(_))
        ));
        assert!(matches!(
            InsituTable::from_pickle(b"definitely not a pickle"),
            Err(InsituError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            pickle(&json!([{"variable": "chl", "date": "2024-06-01", "lat": 41.0, "lon": -73.0, "value": 1.5}])),
        )
        .unwrap();

        let table = InsituTable::load(&file.path().to_string_lossy(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(table.len(), 1);
    }
}
