//! Immutable in-memory tables loaded from the dataset store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{WatmError, WatmResult};
use crate::filter::ParamValue;

/// Column holding the scenario identifier in the scenario and variable tables.
pub const SCENARIO_ID: &str = "scenario_id";

/// Table names that never denote a variable.
pub const RESERVED_TABLES: [&str; 2] = ["scenarios", "time"];

/// One row per scenario: id plus one value per parameter column.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTable {
    ids: Vec<String>,
    param_names: Vec<String>,
    rows: Vec<Vec<ParamValue>>,
    index: HashMap<String, usize>,
}

impl ScenarioTable {
    pub fn new(param_names: Vec<String>, rows: Vec<(String, Vec<ParamValue>)>) -> WatmResult<Self> {
        let mut seen = BTreeSet::new();
        for name in &param_names {
            if name == SCENARIO_ID {
                return Err(WatmError::DataIntegrity(format!(
                    "'{SCENARIO_ID}' cannot be used as a parameter name"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(WatmError::DataIntegrity(format!(
                    "duplicate parameter column '{name}'"
                )));
            }
        }

        let mut ids = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());
        for (id, row) in rows {
            if row.len() != param_names.len() {
                return Err(WatmError::DataIntegrity(format!(
                    "scenario '{id}' has {} parameter values, expected {}",
                    row.len(),
                    param_names.len()
                )));
            }
            if index.insert(id.clone(), ids.len()).is_some() {
                return Err(WatmError::DataIntegrity(format!(
                    "duplicate scenario id '{id}'"
                )));
            }
            ids.push(id);
            values.push(row);
        }

        Ok(Self {
            ids,
            param_names,
            rows: values,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|p| p == name)
    }

    /// Like [`param_index`](Self::param_index) but reports the valid names on a miss.
    pub fn require_param(&self, name: &str) -> WatmResult<usize> {
        self.param_index(name)
            .ok_or_else(|| WatmError::UnknownParameter {
                name: name.to_string(),
                available: self.param_names.clone(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn params_of(&self, id: &str) -> Option<&[ParamValue]> {
        self.index.get(id).map(|&row| self.rows[row].as_slice())
    }

    /// Rows in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.ids
            .iter()
            .zip(self.rows.iter())
            .map(|(id, row)| (id.as_str(), row.as_slice()))
    }

    pub fn distinct_values(&self, column: usize) -> BTreeSet<ParamValue> {
        self.rows.iter().map(|row| row[column].clone()).collect()
    }
}

/// Simulation step -> real-world time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeTable {
    steps: BTreeMap<i64, f64>,
}

impl TimeTable {
    pub fn new(entries: impl IntoIterator<Item = (i64, f64)>) -> WatmResult<Self> {
        let mut steps = BTreeMap::new();
        for (step, time) in entries {
            if step < 0 {
                return Err(WatmError::DataIntegrity(format!(
                    "negative step {step} in time table"
                )));
            }
            if steps.insert(step, time).is_some() {
                return Err(WatmError::DataIntegrity(format!(
                    "duplicate step {step} in time table"
                )));
            }
        }
        Ok(Self { steps })
    }

    pub fn time_of(&self, step: i64) -> Option<f64> {
        self.steps.get(&step).copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `(step, time)` pairs in ascending step order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.steps.iter().map(|(step, time)| (*step, *time))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub scenario_id: String,
    pub step: i64,
    pub value: f64,
}

/// Raw rows of one variable table, in storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSeries {
    points: Vec<SeriesPoint>,
}

impl VariableSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<SeriesPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Display name <-> storage key mapping for variables.
///
/// Names without an entry are their own storage key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableNameMap {
    to_key: BTreeMap<String, String>,
    to_name: BTreeMap<String, String>,
}

impl VariableNameMap {
    pub fn from_pairs<I, N, K>(pairs: I) -> WatmResult<Self>
    where
        I: IntoIterator<Item = (N, K)>,
        N: Into<String>,
        K: Into<String>,
    {
        let mut map = Self::default();
        for (name, key) in pairs {
            let (name, key) = (name.into(), key.into());
            if let Some(existing) = map.to_name.get(&key) {
                if existing != &name {
                    return Err(WatmError::DataIntegrity(format!(
                        "storage key '{key}' is mapped from both '{existing}' and '{name}'"
                    )));
                }
            }
            if let Some(existing) = map.to_key.get(&name) {
                if existing != &key {
                    return Err(WatmError::DataIntegrity(format!(
                        "variable '{name}' is mapped to both '{existing}' and '{key}'"
                    )));
                }
            }
            map.to_name.insert(key.clone(), name.clone());
            map.to_key.insert(name, key);
        }
        Ok(map)
    }

    pub fn storage_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.to_key.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.to_name.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.to_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_key.is_empty()
    }
}

/// Everything that is loaded once per process and shared read-only.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub scenarios: ScenarioTable,
    pub time: TimeTable,
    pub names: VariableNameMap,
}

impl Catalog {
    pub fn new(scenarios: ScenarioTable, time: TimeTable, names: VariableNameMap) -> Self {
        Self {
            scenarios,
            time,
            names,
        }
    }
}
