//! Series retrieval: resolve scenarios, read variable tables restricted to
//! them, join time and (optionally) parameters.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;
use watm_core::{
    Catalog, Filters, SeriesFrame, SeriesPoint, SeriesRow, SeriesSource, TimeWindow, WatmError,
    WatmResult,
};
use watm_scenarios::resolve_scenarios;

/// Everything that determines the rows of a series query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRequest {
    pub variables: Vec<String>,
    pub filters: Filters,
    pub time_window: Option<TimeWindow>,
    pub include_params: bool,
}

impl SeriesRequest {
    /// A request for `variables` over every scenario, with parameters joined.
    pub fn new<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            filters: Filters::new(),
            time_window: None,
            include_params: true,
        }
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_time_window(mut self, window: Option<TimeWindow>) -> Self {
        self.time_window = window;
        self
    }

    pub fn with_params(mut self, include_params: bool) -> Self {
        self.include_params = include_params;
        self
    }

    /// Sorted, de-duplicated variable names: the order rows are concatenated in.
    pub fn normalized_variables(&self) -> Vec<String> {
        self.variables
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_single_variable(&self) -> bool {
        self.normalized_variables().len() == 1
    }
}

/// Runs a series query against `source`.
///
/// Validation happens before any variable table is read: the variable list
/// must be non-empty, every filter key must be a parameter and every
/// variable must have a backing table. Rows are restricted to the resolved
/// scenarios while each table is read, so orphan scenario ids never reach
/// the time join.
pub fn fetch_series(
    catalog: &Catalog,
    source: &dyn SeriesSource,
    request: &SeriesRequest,
) -> WatmResult<SeriesFrame> {
    let variables = request.normalized_variables();
    if variables.is_empty() {
        return Err(WatmError::InvalidRequest(
            "at least one variable is required".into(),
        ));
    }

    let selected = resolve_scenarios(&catalog.scenarios, &request.filters)?;
    let keys = storage_keys_for(catalog, source, &variables)?;
    let multi = variables.len() > 1;
    let param_names = if request.include_params {
        catalog.scenarios.param_names().to_vec()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    if selected.is_empty() {
        debug!(?variables, "filters matched no scenarios");
        return Ok(SeriesFrame::new(variables, param_names, rows));
    }

    for (variable, key) in variables.iter().zip(&keys) {
        let series = source.load_series(key, &|id| selected.contains(id))?;
        debug!(variable = %variable, rows = series.len(), "loaded variable rows");
        for point in series.into_points() {
            if let Some(row) = join_point(catalog, point, request, multi.then_some(variable))? {
                rows.push(row);
            }
        }
    }

    Ok(SeriesFrame::new(variables, param_names, rows))
}

/// One scenario's series for one variable, ordered by step.
pub fn fetch_scenario_series(
    catalog: &Catalog,
    source: &dyn SeriesSource,
    variable: &str,
    scenario_id: &str,
    window: Option<TimeWindow>,
) -> WatmResult<SeriesFrame> {
    if !catalog.scenarios.contains(scenario_id) {
        return Err(WatmError::UnknownScenario(scenario_id.to_string()));
    }
    let key = storage_key_for(catalog, source, variable)?;
    let request = SeriesRequest::new([variable])
        .with_time_window(window)
        .with_params(false);

    let series = source.load_series(&key, &|id| id == scenario_id)?;
    let mut rows = Vec::with_capacity(series.len());
    for point in series.into_points() {
        if let Some(row) = join_point(catalog, point, &request, None)? {
            rows.push(row);
        }
    }
    rows.sort_by_key(|row| row.step);
    Ok(SeriesFrame::new(request.variables, Vec::new(), rows))
}

/// Maps display names to storage keys, failing on the first variable with
/// no backing table.
fn storage_keys_for(
    catalog: &Catalog,
    source: &dyn SeriesSource,
    variables: &[String],
) -> WatmResult<Vec<String>> {
    variables
        .iter()
        .map(|variable| storage_key_for(catalog, source, variable))
        .collect()
}

fn storage_key_for(
    catalog: &Catalog,
    source: &dyn SeriesSource,
    variable: &str,
) -> WatmResult<String> {
    let key = catalog.names.storage_key(variable).to_string();
    if source.has_series(&key) {
        Ok(key)
    } else {
        Err(WatmError::VariableNotFound {
            variable: variable.to_string(),
            storage_key: key,
        })
    }
}

/// Time join, window filter and parameter join for one retained point.
fn join_point(
    catalog: &Catalog,
    point: SeriesPoint,
    request: &SeriesRequest,
    variable: Option<&String>,
) -> WatmResult<Option<SeriesRow>> {
    let time = catalog.time.time_of(point.step).ok_or_else(|| {
        WatmError::DataIntegrity(format!(
            "step {} of scenario '{}' has no entry in the time table",
            point.step, point.scenario_id
        ))
    })?;
    if let Some(window) = &request.time_window {
        if !window.contains(time) {
            return Ok(None);
        }
    }
    let params = if request.include_params {
        catalog
            .scenarios
            .params_of(&point.scenario_id)
            .map(<[_]>::to_vec)
            .ok_or_else(|| WatmError::UnknownScenario(point.scenario_id.clone()))?
    } else {
        Vec::new()
    };
    Ok(Some(SeriesRow {
        scenario_id: point.scenario_id,
        variable: variable.cloned(),
        step: point.step,
        time,
        value: point.value,
        params,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use watm_core::{
        Filter, InMemorySource, ParamValue, ScenarioTable, TimeTable, VariableNameMap,
    };

    fn point(id: &str, step: i64, value: f64) -> SeriesPoint {
        SeriesPoint {
            scenario_id: id.into(),
            step,
            value,
        }
    }

    fn catalog() -> Catalog {
        let scenarios = ScenarioTable::new(
            vec!["P1".into(), "P2".into()],
            vec![
                ("sc_0".into(), vec![ParamValue::from(1), "A".into()]),
                ("sc_1".into(), vec![ParamValue::from(1), "B".into()]),
                ("sc_2".into(), vec![ParamValue::from(2), "A".into()]),
            ],
        )
        .unwrap();
        let time = TimeTable::new([(0, 2020.0), (1, 2025.0), (2, 2030.0)]).unwrap();
        let names = VariableNameMap::from_pairs([("YRB WSI", "yrb_wsi")]).unwrap();
        Catalog::new(scenarios, time, names)
    }

    fn source() -> InMemorySource {
        InMemorySource::new()
            .with_series(
                "yrb_wsi",
                vec![
                    point("sc_0", 0, 1.0),
                    point("sc_0", 1, 2.0),
                    point("sc_1", 0, 3.0),
                    point("sc_2", 2, 4.0),
                    point("ghost", 0, 99.0),
                ],
            )
            .with_series("gdp", vec![point("sc_2", 0, 10.0)])
    }

    #[test]
    fn resolves_display_names_and_excludes_orphans() {
        let frame = fetch_series(&catalog(), &source(), &SeriesRequest::new(["YRB WSI"])).unwrap();
        assert_eq!(frame.len(), 4);
        assert!(frame.rows().iter().all(|r| r.scenario_id != "ghost"));
        assert!(frame.rows().iter().all(|r| r.variable.is_none()));
        assert_eq!(frame.param_names(), ["P1", "P2"]);
    }

    #[test]
    fn filters_and_window_restrict_rows() {
        let request = SeriesRequest::new(["YRB WSI"])
            .with_filters(Filters::from([("P1".to_string(), Filter::equals(1))]))
            .with_time_window(Some(TimeWindow::new(2020.0, 2020.0).unwrap()))
            .with_params(false);
        let frame = fetch_series(&catalog(), &source(), &request).unwrap();
        let ids: Vec<_> = frame.rows().iter().map(|r| r.scenario_id.as_str()).collect();
        assert_eq!(ids, vec!["sc_0", "sc_1"]);
        assert!(frame.rows().iter().all(|r| r.params.is_empty()));
        assert!(!frame.has_params());
    }

    #[test]
    fn multi_variable_rows_follow_sorted_order() {
        let request = SeriesRequest::new(["gdp", "YRB WSI", "gdp"]);
        let frame = fetch_series(&catalog(), &source(), &request).unwrap();
        assert_eq!(frame.variables(), ["YRB WSI", "gdp"]);
        assert_eq!(frame.rows()[0].variable.as_deref(), Some("YRB WSI"));
        assert_eq!(frame.rows().last().unwrap().variable.as_deref(), Some("gdp"));
    }

    #[test]
    fn zero_matching_scenarios_is_an_empty_frame() {
        let request = SeriesRequest::new(["YRB WSI"])
            .with_filters(Filters::from([("P1".to_string(), Filter::equals(3))]));
        let frame = fetch_series(&catalog(), &source(), &request).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn unknown_parameter_fails_before_reading() {
        let source = source();
        let request = SeriesRequest::new(["YRB WSI"])
            .with_filters(Filters::from([("P7".to_string(), Filter::equals(1))]));
        assert!(matches!(
            fetch_series(&catalog(), &source, &request),
            Err(WatmError::UnknownParameter { .. })
        ));
        assert_eq!(source.load_count(), 0);
    }

    #[test]
    fn missing_variable_reports_storage_key() {
        let source = source();
        let request = SeriesRequest::new(["YRB WSI", "missing"]);
        match fetch_series(&catalog(), &source, &request) {
            Err(WatmError::VariableNotFound {
                variable,
                storage_key,
            }) => {
                assert_eq!(variable, "missing");
                assert_eq!(storage_key, "missing");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(source.load_count(), 0);
    }

    #[test]
    fn missing_step_is_a_data_integrity_error() {
        let source = InMemorySource::new().with_series("bad", vec![point("sc_0", 7, 1.0)]);
        assert!(matches!(
            fetch_series(&catalog(), &source, &SeriesRequest::new(["bad"])),
            Err(WatmError::DataIntegrity(_))
        ));
    }

    #[test]
    fn empty_variable_list_is_invalid() {
        let request = SeriesRequest::new(Vec::<String>::new());
        assert!(matches!(
            fetch_series(&catalog(), &source(), &request),
            Err(WatmError::InvalidRequest(_))
        ));
    }

    #[test]
    fn scenario_series_is_ordered_by_step() {
        let frame =
            fetch_scenario_series(&catalog(), &source(), "YRB WSI", "sc_0", None).unwrap();
        let steps: Vec<_> = frame.rows().iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![0, 1]);
        assert!(matches!(
            fetch_scenario_series(&catalog(), &source(), "YRB WSI", "ghost", None),
            Err(WatmError::UnknownScenario(_))
        ));
    }
}
