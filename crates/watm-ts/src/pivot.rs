use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use watm_core::{ParamValue, SeriesFrame, WatmError, WatmResult};

/// Wide table: one row per time, one column per scenario or parameter level.
///
/// `values[i][j]` is the value at `index[i]` for `columns[j]`; cells with no
/// row are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideFrame {
    pub index: Vec<f64>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl WideFrame {
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let j = self.columns.iter().position(|c| c == name)?;
        Some(self.values.iter().map(|row| row[j]).collect())
    }
}

/// Pivots a long-form frame to wide form.
///
/// With `pivot_param`, columns are the distinct values of that parameter in
/// value order; the frame must carry parameters. Without it, columns are the
/// scenario ids in sorted order. When several rows land in the same cell the
/// first one in frame order is kept.
pub fn pivot(frame: &SeriesFrame, pivot_param: Option<&str>) -> WatmResult<WideFrame> {
    let position = pivot_param
        .map(|name| {
            frame
                .param_position(name)
                .ok_or_else(|| WatmError::UnknownParameter {
                    name: name.to_string(),
                    available: frame.param_names().to_vec(),
                })
        })
        .transpose()?;

    // Times are finite, so total_cmp gives the natural order.
    let mut times: Vec<f64> = frame.rows().iter().map(|r| r.time).collect();
    times.sort_by(f64::total_cmp);
    times.dedup();

    let mut cells: BTreeMap<(usize, ColumnKey), f64> = BTreeMap::new();
    let mut keys: BTreeSet<ColumnKey> = BTreeSet::new();
    for row in frame.rows() {
        let key = match position {
            Some(idx) => ColumnKey::Param(row.params.get(idx).cloned().ok_or_else(|| {
                WatmError::DataIntegrity(format!(
                    "row for scenario '{}' is missing parameter values",
                    row.scenario_id
                ))
            })?),
            None => ColumnKey::Scenario(row.scenario_id.clone()),
        };
        let i = times
            .binary_search_by(|t| t.total_cmp(&row.time))
            .map_err(|_| WatmError::DataIntegrity(format!("time {} missing from index", row.time)))?;
        keys.insert(key.clone());
        cells.entry((i, key)).or_insert(row.value);
    }

    let keys: Vec<ColumnKey> = keys.into_iter().collect();
    let values = (0..times.len())
        .map(|i| {
            keys.iter()
                .map(|key| cells.get(&(i, key.clone())).copied())
                .collect()
        })
        .collect();

    Ok(WideFrame {
        index: times,
        columns: keys.iter().map(ColumnKey::label).collect(),
        values,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ColumnKey {
    Param(ParamValue),
    Scenario(String),
}

impl ColumnKey {
    fn label(&self) -> String {
        match self {
            ColumnKey::Param(value) => value.to_string(),
            ColumnKey::Scenario(id) => id.clone(),
        }
    }
}
