//! Directory-backed dataset store.
//!
//! Layout:
//!
//! ```text
//! data_dir/
//!   scenarios.parquet        # scenario_id (or scenario_name), param_1..param_k
//!   time.parquet             # step, time
//!   <storage_key>.parquet    # scenario_id, step, value (one file per variable)
//!   variables_map.json       # optional {"Display name": "storage_key"}
//! ```
//!
//! Every table may also be a `.csv` file. Parquet wins when both exist and
//! the `parquet` feature is enabled.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use watm_core::{
    Catalog, ParamValue, ScenarioTable, SeriesPoint, SeriesSource, TimeTable, VariableNameMap,
    VariableSeries, WatmError, WatmResult, RESERVED_TABLES, SCENARIO_ID,
};

use crate::frame::{
    as_float, as_int, as_text, column, float_values, int_values, read_frame, storage_err,
    text_values,
};

/// Scenario id column name written by the preprocessing scripts.
pub const LEGACY_SCENARIO_ID: &str = "scenario_name";
pub const VARIABLES_MAP_FILE: &str = "variables_map.json";

#[cfg(feature = "parquet")]
const EXTENSIONS: [&str; 2] = ["parquet", "csv"];
#[cfg(not(feature = "parquet"))]
const EXTENSIONS: [&str; 2] = ["csv", "parquet"];

#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn open(root: impl AsRef<Path>) -> WatmResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(WatmError::Storage(format!(
                "data directory not found: {}",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a table name to its file, if any.
    ///
    /// Extensions match case-insensitively, the same way [`Self::tables`]
    /// lists them.
    pub fn table_path(&self, name: &str) -> Option<PathBuf> {
        self.tables().ok()?.remove(name)
    }

    /// Table name -> file for every supported file in the root, keeping the
    /// preferred format when a name exists in both.
    pub fn tables(&self) -> WatmResult<BTreeMap<String, PathBuf>> {
        let mut found: BTreeMap<String, (usize, PathBuf)> = BTreeMap::new();
        let entries = fs::read_dir(&self.root)
            .map_err(storage_err(format!("listing {}", self.root.display())))?;
        for entry in entries {
            let path = entry?.path();
            let Some(rank) = extension_rank(&path) else {
                continue;
            };
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match found.get(stem) {
                Some((best, _)) if *best <= rank => {}
                _ => {
                    found.insert(stem.to_string(), (rank, path));
                }
            }
        }
        Ok(found
            .into_iter()
            .map(|(name, (_, path))| (name, path))
            .collect())
    }

    fn require_table(&self, name: &str) -> WatmResult<PathBuf> {
        self.table_path(name).ok_or_else(|| {
            WatmError::Storage(format!(
                "table '{name}' not found in {}",
                self.root.display()
            ))
        })
    }

    pub fn load_catalog(&self) -> WatmResult<Catalog> {
        Ok(Catalog::new(
            self.load_scenarios()?,
            self.load_time()?,
            self.load_name_map()?,
        ))
    }

    pub fn load_scenarios(&self) -> WatmResult<ScenarioTable> {
        let path = self.require_table("scenarios")?;
        let df = read_frame(&path)?;
        let id_name = scenario_id_column(&df.get_column_names(), "scenarios")?;
        let ids = text_values(column(&df, id_name, "scenarios")?)?;

        let param_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| *name != id_name)
            .map(str::to_string)
            .collect();
        let mut param_columns = Vec::with_capacity(param_names.len());
        for name in &param_names {
            let series = column(&df, name, "scenarios")?;
            let values: Vec<Option<ParamValue>> = if series.dtype().is_numeric() {
                float_values(series)?
                    .into_iter()
                    .map(|v| v.map(ParamValue::Number))
                    .collect()
            } else {
                text_values(series)?
                    .into_iter()
                    .map(|v| v.map(ParamValue::Text))
                    .collect()
            };
            param_columns.push(values);
        }

        let mut rows = Vec::with_capacity(ids.len());
        for (row, id) in ids.into_iter().enumerate() {
            let id = id.ok_or_else(|| {
                WatmError::DataIntegrity(format!("scenario row {row} has no id"))
            })?;
            let mut values = Vec::with_capacity(param_names.len());
            for (name, cells) in param_names.iter().zip(param_columns.iter_mut()) {
                let value = cells[row].take().ok_or_else(|| {
                    WatmError::DataIntegrity(format!("scenario '{id}' has no value for '{name}'"))
                })?;
                values.push(value);
            }
            rows.push((id, values));
        }

        let table = ScenarioTable::new(param_names, rows)?;
        debug!(
            scenarios = table.len(),
            params = table.param_names().len(),
            "loaded scenario table"
        );
        Ok(table)
    }

    pub fn load_time(&self) -> WatmResult<TimeTable> {
        let path = self.require_table("time")?;
        let df = read_frame(&path)?;
        let steps = int_values(column(&df, "step", "time")?)?;
        let times = float_values(column(&df, "time", "time")?)?;
        let mut entries = Vec::with_capacity(steps.len());
        for (row, (step, time)) in steps.into_iter().zip(times).enumerate() {
            match (step, time) {
                (Some(step), Some(time)) => entries.push((step, time)),
                _ => {
                    return Err(WatmError::DataIntegrity(format!(
                        "time table row {row} has a missing step or time"
                    )))
                }
            }
        }
        let table = TimeTable::new(entries)?;
        debug!(steps = table.len(), "loaded time table");
        Ok(table)
    }

    /// Reads `variables_map.json`; a missing file means names are storage keys.
    pub fn load_name_map(&self) -> WatmResult<VariableNameMap> {
        let path = self.root.join(VARIABLES_MAP_FILE);
        if !path.is_file() {
            return Ok(VariableNameMap::default());
        }
        let text = fs::read_to_string(&path)?;
        let pairs: BTreeMap<String, String> = serde_json::from_str(&text)?;
        VariableNameMap::from_pairs(pairs)
    }
}

/// Position of the file's extension in [`EXTENSIONS`], ignoring case.
fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?;
    EXTENSIONS.iter().position(|e| ext.eq_ignore_ascii_case(e))
}

fn scenario_id_column<'a>(columns: &[&'a str], table: &str) -> WatmResult<&'a str> {
    columns
        .iter()
        .copied()
        .find(|name| *name == SCENARIO_ID)
        .or_else(|| columns.iter().copied().find(|name| *name == LEGACY_SCENARIO_ID))
        .ok_or_else(|| {
            WatmError::Storage(format!(
                "table '{table}' has neither '{SCENARIO_ID}' nor '{LEGACY_SCENARIO_ID}' column"
            ))
        })
}

impl SeriesSource for DatasetStore {
    fn storage_keys(&self) -> WatmResult<Vec<String>> {
        Ok(self
            .tables()?
            .into_keys()
            .filter(|name| !RESERVED_TABLES.contains(&name.as_str()))
            .collect())
    }

    fn has_series(&self, storage_key: &str) -> bool {
        !RESERVED_TABLES.contains(&storage_key) && self.table_path(storage_key).is_some()
    }

    fn load_series(
        &self,
        storage_key: &str,
        keep: &dyn Fn(&str) -> bool,
    ) -> WatmResult<VariableSeries> {
        let path = self
            .table_path(storage_key)
            .filter(|_| !RESERVED_TABLES.contains(&storage_key))
            .ok_or_else(|| WatmError::VariableNotFound {
                variable: storage_key.to_string(),
                storage_key: storage_key.to_string(),
            })?;
        let df = read_frame(&path)?;
        let id_name = scenario_id_column(&df.get_column_names(), storage_key)?;

        let ids = as_text(column(&df, id_name, storage_key)?)?;
        let ids = ids.utf8().map_err(storage_err("reading scenario ids"))?;
        let steps = as_int(column(&df, "step", storage_key)?)?;
        let steps = steps.i64().map_err(storage_err("reading steps"))?;
        let values = as_float(column(&df, "value", storage_key)?)?;
        let values = values.f64().map_err(storage_err("reading values"))?;

        let mut points = Vec::new();
        for (row, ((id, step), value)) in ids
            .into_iter()
            .zip(steps.into_iter())
            .zip(values.into_iter())
            .enumerate()
        {
            let id = id.ok_or_else(|| {
                WatmError::DataIntegrity(format!("{storage_key}: row {row} has no scenario id"))
            })?;
            if !keep(id) {
                continue;
            }
            let step = step.ok_or_else(|| {
                WatmError::DataIntegrity(format!("{storage_key}: row {row} has no step"))
            })?;
            // Null values are missing observations, same as an absent row.
            if let Some(value) = value {
                points.push(SeriesPoint {
                    scenario_id: id.to_string(),
                    step,
                    value,
                });
            }
        }
        debug!(
            storage_key,
            rows = df.height(),
            kept = points.len(),
            "loaded variable table"
        );
        Ok(VariableSeries::new(points))
    }
}
