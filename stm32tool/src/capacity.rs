//! The capacity database: flash and RAM sizes per MCU, refreshed from the
//! vendor's product table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fetch::{FetchError, Fetcher};

/// The column holding the MCU name in the vendor product table.
pub const NAME_COLUMN_ID: i64 = 1;

/// Label substring identifying the flash size column.
pub const FLASH_COLUMN_LABEL: &str = "FLASH";

/// Label substring identifying the RAM size column.
pub const RAM_COLUMN_LABEL: &str = "RAM";

/// Memory sizes of one MCU, in kB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    #[serde(deserialize_with = "lenient_kb")]
    pub flash: u32,
    #[serde(deserialize_with = "lenient_kb")]
    pub ram: u32,
}

/// Accepts sizes stored either as JSON numbers or as numeric strings.
fn lenient_kb<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_kb(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid size {value}")))
}

fn parse_kb(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|kb| u32::try_from(kb).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// A complete name to capacity mapping.
///
/// Snapshots are only ever replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacitySnapshot(BTreeMap<String, Capacity>);

impl CapacitySnapshot {
    pub fn get(&self, name: &str) -> Option<Capacity> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Capacity)> {
        self.0.iter().map(|(name, capacity)| (name.as_str(), capacity))
    }
}

impl FromIterator<(String, Capacity)> for CapacitySnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Capacity)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The vendor product table, as far as it is needed here.
///
/// Rows are kept as raw JSON and checked one by one, so a single malformed
/// row cannot fail the whole table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceTable {
    pub columns: Vec<SourceColumn>,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceColumn {
    pub id: Value,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRow {
    #[serde(default)]
    pub cells: Option<Vec<SourceCell>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceCell {
    /// Cells without a column id never match a column.
    #[serde(rename = "columnId", default)]
    pub column_id: Value,
    #[serde(default)]
    pub value: Value,
}

/// Column ids are numbers in some table revisions and strings in others.
fn column_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

impl SourceRow {
    /// Reads row `index` of a table.
    pub fn parse(index: usize, value: &Value) -> Result<Self, RowError> {
        let row: Self = serde_json::from_value(value.clone()).map_err(|error| RowError::Invalid {
            row: index,
            reason: error.to_string(),
        })?;
        if row.cells.is_none() {
            return Err(RowError::NoCells { row: index });
        }
        Ok(row)
    }

    fn cell(&self, id: i64) -> Option<&Value> {
        self.cells
            .iter()
            .flatten()
            .find(|cell| column_id(&cell.column_id) == Some(id))
            .map(|cell| &cell.value)
            .filter(|value| !value.is_null())
    }
}

/// Why a single table row was left out of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum RowError {
    /// Row {row} is not a table row: {reason}.
    Invalid { row: usize, reason: String },

    /// Row {row} has no cells.
    NoCells { row: usize },

    /// Row {row} has no {column} cell.
    MissingCell { row: usize, column: &'static str },

    /// Row {row} has a malformed {column} value: {value}.
    Malformed {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Errors that fail a whole refresh. The stored snapshot is left untouched.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum RefreshError {
    /// Failed to download the product table.
    Fetch(#[from] FetchError),

    /// The product table is not valid JSON.
    Parse(#[from] serde_json::Error),

    /// The product table has no column labelled {label:?}.
    MissingColumn { label: &'static str },

    /// Failed to store the snapshot at {path:?}.
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The outcome of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub snapshot: CapacitySnapshot,
    /// Rows that were skipped, for diagnostics.
    pub skipped: Vec<RowError>,
}

/// Locates a column by label substring. The last matching column wins.
fn find_column(columns: &[SourceColumn], label: &'static str) -> Result<i64, RefreshError> {
    columns
        .iter()
        .filter(|column| column.name.contains(label))
        .filter_map(|column| column_id(&column.id))
        .last()
        .ok_or(RefreshError::MissingColumn { label })
}

fn read_row(
    index: usize,
    row: &Value,
    flash_id: i64,
    ram_id: i64,
) -> Result<(String, Capacity), RowError> {
    let row = SourceRow::parse(index, row)?;
    let name = match row.cell(NAME_COLUMN_ID) {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_uppercase(),
        Some(other) => {
            return Err(RowError::Malformed {
                row: index,
                column: "name",
                value: other.to_string(),
            })
        }
        None => {
            return Err(RowError::MissingCell {
                row: index,
                column: "name",
            })
        }
    };

    let size = |id: i64, column: &'static str| {
        let value = row
            .cell(id)
            .ok_or(RowError::MissingCell { row: index, column })?;
        parse_kb(value).ok_or_else(|| RowError::Malformed {
            row: index,
            column,
            value: value.to_string(),
        })
    };

    let capacity = Capacity {
        flash: size(flash_id, "flash")?,
        ram: size(ram_id, "ram")?,
    };

    Ok((name, capacity))
}

/// Builds a snapshot from a product table.
///
/// Malformed rows are collected in the report, only missing columns fail.
pub fn build_snapshot(table: &SourceTable) -> Result<RefreshReport, RefreshError> {
    let flash_id = find_column(&table.columns, FLASH_COLUMN_LABEL)?;
    let ram_id = find_column(&table.columns, RAM_COLUMN_LABEL)?;

    let mut entries = Vec::with_capacity(table.rows.len());
    let mut skipped = Vec::new();
    for (index, row) in table.rows.iter().enumerate() {
        match read_row(index, row, flash_id, ram_id) {
            Ok(entry) => entries.push(entry),
            Err(error) => skipped.push(error),
        }
    }

    Ok(RefreshReport {
        snapshot: entries.into_iter().collect(),
        skipped,
    })
}

/// Where a refresh gets its product table from.
pub trait CapacitySource {
    fn fetch_table(&self) -> Result<SourceTable, RefreshError>;
}

/// Downloads the product table as JSON.
pub struct HttpCapacitySource<'a, F> {
    fetcher: &'a F,
    url: &'a str,
}

impl<'a, F: Fetcher> HttpCapacitySource<'a, F> {
    pub fn new(fetcher: &'a F, url: &'a str) -> Self {
        Self { fetcher, url }
    }
}

impl<F: Fetcher> CapacitySource for HttpCapacitySource<'_, F> {
    fn fetch_table(&self) -> Result<SourceTable, RefreshError> {
        tracing::info!("Downloading the MCU database from {}", self.url);
        let bytes = self.fetcher.fetch_bytes(self.url)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// The persisted capacity snapshot.
#[derive(Debug, Clone)]
pub struct CapacityDatabase {
    path: PathBuf,
}

impl CapacityDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored snapshot.
    ///
    /// A missing or corrupt file means there is no local data and yields `None`.
    pub fn load(&self) -> Option<CapacitySnapshot> {
        let content = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                tracing::warn!(
                    "Ignoring corrupt MCU database {}: {error}",
                    self.path.display()
                );
                None
            }
        }
    }

    /// Builds a new snapshot from `source` and stores it in place of the old one.
    #[tracing::instrument(skip_all, name = "Refresh MCU database")]
    pub fn refresh(&self, source: &dyn CapacitySource) -> Result<RefreshReport, RefreshError> {
        let table = source.fetch_table()?;
        let report = build_snapshot(&table)?;

        for row in &report.skipped {
            tracing::debug!("Skipped MCU database row: {row}");
        }
        if !report.skipped.is_empty() {
            tracing::warn!(
                "Skipped {} malformed rows of the MCU database",
                report.skipped.len()
            );
        }

        let content = serde_json::to_vec(&report.snapshot)?;
        crate::repository::persist_atomic(&self.path, &content).map_err(|source| {
            RefreshError::Persist {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::info!(
            "Stored {} MCUs in {}",
            report.snapshot.len(),
            self.path.display()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    pub(crate) struct StaticSource(pub Value);

    impl CapacitySource for StaticSource {
        fn fetch_table(&self) -> Result<SourceTable, RefreshError> {
            Ok(serde_json::from_value(self.0.clone())?)
        }
    }

    fn table() -> Value {
        json!({
            "columns": [
                { "id": 1, "name": "Part Number" },
                { "id": "5", "name": "FLASH Size (kB) (Prog)" },
                { "id": 7, "name": "RAM Size (kB)" },
            ],
            "rows": [
                { "cells": [
                    { "columnId": 1, "value": "STM32F103C8" },
                    { "columnId": "5", "value": "64" },
                    { "columnId": 7, "value": 20 },
                ]},
                { "cells": [
                    { "columnId": 1, "value": "STM32F072RB" },
                    { "columnId": 5, "value": 128 },
                    { "columnId": 7, "value": "16" },
                ]},
                { "cells": [
                    { "columnId": 1, "value": "STM32F030F4" },
                    { "columnId": 5, "value": "16" },
                ]},
                { "cells": [
                    { "columnId": 1, "value": "STM32L476RG" },
                    { "columnId": 5, "value": "1024" },
                    { "columnId": 7, "value": "n/a" },
                ]},
            ]
        })
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let report = build_snapshot(&serde_json::from_value(table()).unwrap()).unwrap();

        assert_eq!(
            report.snapshot.get("STM32F103C8"),
            Some(Capacity { flash: 64, ram: 20 })
        );
        assert_eq!(
            report.snapshot.get("STM32F072RB"),
            Some(Capacity { flash: 128, ram: 16 })
        );
        assert_eq!(report.snapshot.len(), 2);
        assert_eq!(
            report.skipped,
            vec![
                RowError::MissingCell { row: 2, column: "ram" },
                RowError::Malformed {
                    row: 3,
                    column: "ram",
                    value: "\"n/a\"".to_string()
                },
            ]
        );
    }

    #[test]
    fn rows_of_the_wrong_shape_are_skipped() {
        let mut table = table();
        let rows = table["rows"].as_array_mut().unwrap();
        rows.truncate(1);
        rows.push(json!({ "cells": [{ "value": "orphan" }] }));
        rows.push(json!({ "cells": null }));
        rows.push(json!("not-a-row"));
        rows.push(json!({ "cells": [42] }));
        let dir = tempfile::tempdir().unwrap();
        let database = CapacityDatabase::new(dir.path().join("mcu_db.json"));

        let report = database.refresh(&StaticSource(table)).unwrap();

        assert_eq!(
            report.snapshot.get("STM32F103C8"),
            Some(Capacity { flash: 64, ram: 20 })
        );
        assert_eq!(report.snapshot.len(), 1);
        assert_eq!(report.skipped.len(), 4);
        assert_eq!(
            report.skipped[0],
            RowError::MissingCell { row: 1, column: "name" }
        );
        assert_eq!(report.skipped[1], RowError::NoCells { row: 2 });
        assert!(matches!(report.skipped[2], RowError::Invalid { row: 3, .. }));
        assert!(matches!(report.skipped[3], RowError::Invalid { row: 4, .. }));
        assert_eq!(database.load(), Some(report.snapshot));
    }

    #[test]
    fn refresh_replaces_the_stored_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let database = CapacityDatabase::new(dir.path().join("mcu_db.json"));
        assert_eq!(database.load(), None);

        database.refresh(&StaticSource(table())).unwrap();

        let loaded = database.load().unwrap();
        assert_eq!(loaded.get("STM32F103C8"), Some(Capacity { flash: 64, ram: 20 }));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn refresh_without_ram_column_keeps_the_old_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let database = CapacityDatabase::new(dir.path().join("mcu_db.json"));
        database.refresh(&StaticSource(table())).unwrap();
        let before = std::fs::read(database.path()).unwrap();

        let mut broken = table();
        broken["columns"].as_array_mut().unwrap().remove(2);
        let result = database.refresh(&StaticSource(broken));

        assert!(matches!(
            result,
            Err(RefreshError::MissingColumn { label: "RAM" })
        ));
        assert_eq!(std::fs::read(database.path()).unwrap(), before);
    }

    #[test]
    fn the_last_matching_column_wins() {
        let table = json!({
            "columns": [
                { "id": 2, "name": "FLASH Size (kB)" },
                { "id": 3, "name": "Data FLASH (kB)" },
                { "id": 4, "name": "RAM" },
            ],
            "rows": [{ "cells": [
                { "columnId": 1, "value": "STM32L151C8" },
                { "columnId": 2, "value": 64 },
                { "columnId": 3, "value": 4 },
                { "columnId": 4, "value": 10 },
            ]}]
        });

        let report = build_snapshot(&serde_json::from_value(table).unwrap()).unwrap();

        assert_eq!(
            report.snapshot.get("STM32L151C8"),
            Some(Capacity { flash: 4, ram: 10 })
        );
    }

    #[test]
    fn numeric_strings_are_normalized_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcu_db.json");
        std::fs::write(
            &path,
            r#"{"STM32F051K8": {"flash": "64", "ram": 8}}"#,
        )
        .unwrap();

        let loaded = CapacityDatabase::new(&path).load().unwrap();

        assert_eq!(loaded.get("STM32F051K8"), Some(Capacity { flash: 64, ram: 8 }));
    }

    #[test]
    fn corrupt_database_loads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcu_db.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(CapacityDatabase::new(&path).load(), None);
    }
}
