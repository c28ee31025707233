use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use watm_core::{Filters, ParamValue, ScenarioTable, WatmResult};

use crate::resolve::resolve_scenarios;

/// Distinct values of one parameter among the selected scenarios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSummary {
    pub parameter: String,
    pub n_unique: usize,
    pub values: Vec<ParamValue>,
    pub n_scenarios: usize,
}

/// One summary per parameter, in table column order.
///
/// Values and counts are both taken over the scenarios matching `filters`,
/// so pinning one parameter shows how the others are distributed within it.
pub fn param_summary(table: &ScenarioTable, filters: &Filters) -> WatmResult<Vec<ParamSummary>> {
    let selected = resolve_scenarios(table, filters)?;
    let n_scenarios = selected.len();
    Ok(table
        .param_names()
        .iter()
        .enumerate()
        .map(|(column, name)| {
            let values: Vec<ParamValue> = table
                .iter()
                .filter(|(id, _)| selected.contains(*id))
                .filter_map(|(_, row)| row.get(column).cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            ParamSummary {
                parameter: name.clone(),
                n_unique: values.len(),
                values,
                n_scenarios,
            }
        })
        .collect())
}

/// Parameter name -> sorted distinct values.
pub fn param_values(table: &ScenarioTable) -> BTreeMap<String, Vec<ParamValue>> {
    table
        .param_names()
        .iter()
        .enumerate()
        .map(|(column, name)| {
            (
                name.clone(),
                table.distinct_values(column).into_iter().collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use watm_core::{Filter, WatmError};

    fn table() -> ScenarioTable {
        ScenarioTable::new(
            vec!["P1".into(), "P2".into()],
            vec![
                ("sc_0".into(), vec![2.0.into(), "B".into()]),
                ("sc_1".into(), vec![1.0.into(), "A".into()]),
                ("sc_2".into(), vec![2.0.into(), "A".into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn summary_keeps_column_order_and_sorts_values() {
        let summary = param_summary(&table(), &Filters::new()).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].parameter, "P1");
        assert_eq!(summary[0].values, vec![ParamValue::from(1.0), ParamValue::from(2.0)]);
        assert_eq!(summary[1].values, vec![ParamValue::from("A"), ParamValue::from("B")]);
        assert!(summary.iter().all(|s| s.n_scenarios == 3));
    }

    #[test]
    fn summary_counts_filtered_scenarios() {
        let filters = Filters::from([("P2".to_string(), Filter::equals("A"))]);
        let summary = param_summary(&table(), &filters).unwrap();
        assert_eq!(summary[0].n_scenarios, 2);
        assert_eq!(summary[0].n_unique, 2);
        assert_eq!(summary[1].values, vec![ParamValue::from("A")]);
    }

    #[test]
    fn pinned_parameter_has_a_single_value() {
        let filters = Filters::from([("P1".to_string(), Filter::equals(2))]);
        let summary = param_summary(&table(), &filters).unwrap();
        assert_eq!(summary[0].n_unique, 1);
        assert_eq!(summary[0].values, vec![ParamValue::from(2.0)]);
        assert_eq!(summary[1].values, vec![ParamValue::from("A"), ParamValue::from("B")]);
        assert!(summary.iter().all(|s| s.n_scenarios == 2));
    }

    #[test]
    fn empty_selection_has_no_values() {
        let filters = Filters::from([("P1".to_string(), Filter::equals(7))]);
        let summary = param_summary(&table(), &filters).unwrap();
        assert!(summary.iter().all(|s| s.n_unique == 0 && s.n_scenarios == 0));
    }

    #[test]
    fn summary_rejects_unknown_filter() {
        let filters = Filters::from([("P9".to_string(), Filter::equals(1))]);
        assert!(matches!(
            param_summary(&table(), &filters),
            Err(WatmError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn values_serialize_as_plain_json() {
        let values = param_values(&table());
        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json, serde_json::json!({"P1": [1.0, 2.0], "P2": ["A", "B"]}));
    }
}
