//! The materialized result of a series query.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::filter::{ParamValue, TimeWindow};
use crate::table::SCENARIO_ID;

/// One long-form row: a variable's value for one scenario at one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRow {
    pub scenario_id: String,
    /// Only set when the frame holds more than one variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub step: i64,
    pub time: f64,
    pub value: f64,
    /// Parameter values aligned with [`SeriesFrame::param_names`]; empty
    /// when parameters were not joined.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamValue>,
}

/// Variable rows joined with time and, optionally, scenario parameters.
///
/// Frames are plain owned values: a caller that mutates its frame never
/// affects another caller or a cached snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesFrame {
    variables: Vec<String>,
    param_names: Vec<String>,
    rows: Vec<SeriesRow>,
}

impl SeriesFrame {
    pub fn new(variables: Vec<String>, param_names: Vec<String>, rows: Vec<SeriesRow>) -> Self {
        Self {
            variables,
            param_names,
            rows,
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<SeriesRow> {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<SeriesRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether rows carry the `variable` discriminator.
    pub fn is_multi_variable(&self) -> bool {
        self.variables.len() > 1
    }

    pub fn has_params(&self) -> bool {
        !self.param_names.is_empty()
    }

    pub fn param_position(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|p| p == name)
    }

    pub fn scenario_ids(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.scenario_id.as_str()).collect()
    }

    pub fn scenario_count(&self) -> usize {
        self.scenario_ids().len()
    }

    /// Column names in output order.
    pub fn column_names(&self) -> Vec<String> {
        let mut columns = vec![SCENARIO_ID.to_string()];
        if self.is_multi_variable() {
            columns.push("variable".to_string());
        }
        columns.extend(["step", "time", "value"].map(String::from));
        columns.extend(self.param_names.iter().cloned());
        columns
    }

    pub fn restrict_scenarios(mut self, keep: &BTreeSet<String>) -> Self {
        self.rows.retain(|row| keep.contains(&row.scenario_id));
        self
    }

    pub fn restrict_time(mut self, window: &TimeWindow) -> Self {
        self.rows.retain(|row| window.contains(row.time));
        self
    }

    pub fn without_params(mut self) -> Self {
        self.param_names.clear();
        for row in &mut self.rows {
            row.params.clear();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> SeriesFrame {
        let rows = [("sc_0", 2020.0, 1.0), ("sc_1", 2020.0, 2.0), ("sc_0", 2030.0, 3.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (id, time, value))| SeriesRow {
                scenario_id: id.into(),
                variable: None,
                step: i as i64,
                time,
                value,
                params: vec![ParamValue::from(id)],
            })
            .collect();
        SeriesFrame::new(vec!["gdp".into()], vec!["label".into()], rows)
    }

    #[test]
    fn columns_follow_variable_and_param_layout() {
        assert_eq!(
            frame().column_names(),
            vec!["scenario_id", "step", "time", "value", "label"]
        );
        let multi = SeriesFrame::new(vec!["a".into(), "b".into()], vec![], vec![]);
        assert_eq!(
            multi.column_names(),
            vec!["scenario_id", "variable", "step", "time", "value"]
        );
    }

    #[test]
    fn restrictions_keep_row_order() {
        let keep: BTreeSet<String> = ["sc_0".to_string()].into_iter().collect();
        let restricted = frame().restrict_scenarios(&keep);
        assert_eq!(restricted.len(), 2);
        assert_eq!(restricted.rows()[1].time, 2030.0);

        let window = TimeWindow::new(2025.0, 2035.0).unwrap();
        let windowed = frame().restrict_time(&window);
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed.rows()[0].value, 3.0);
    }

    #[test]
    fn mutating_a_clone_leaves_the_original_alone() {
        let original = frame();
        let mut copy = original.clone();
        copy.rows_mut()[0].value = 99.0;
        assert_eq!(original.rows()[0].value, 1.0);
        assert_eq!(copy.without_params().param_names().len(), 0);
        assert_eq!(original.scenario_count(), 2);
    }
}
