//! Discovery commands: variables, parameters and scenario selection.

use anyhow::Result;
use serde_json::json;
use watm_query::ScenarioQueryEngine;

use crate::cli::parse_filter_arg;
use crate::common::{OutputFormat, Records};

pub fn variables(engine: &ScenarioQueryEngine, format: OutputFormat) -> Result<()> {
    let rows = engine
        .list_variables()?
        .into_iter()
        .map(|name| json!({ "variable": name }))
        .collect();
    Records::new(["variable"], rows).emit(format)
}

pub fn params(engine: &ScenarioQueryEngine, format: OutputFormat) -> Result<()> {
    let rows = engine
        .param_values()
        .into_iter()
        .map(|(parameter, values)| json!({ "parameter": parameter, "values": values }))
        .collect();
    Records::new(["parameter", "values"], rows).emit(format)
}

pub fn resolve(engine: &ScenarioQueryEngine, filters: &str, format: OutputFormat) -> Result<()> {
    let filters = parse_filter_arg(Some(filters))?;
    let rows = engine
        .resolve_scenarios(&filters)?
        .into_iter()
        .map(|id| json!({ "scenario_id": id }))
        .collect();
    Records::new(["scenario_id"], rows).emit(format)
}

pub fn summary(
    engine: &ScenarioQueryEngine,
    filters: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let filters = parse_filter_arg(filters)?;
    let summary = engine.get_param_summary(&filters)?;
    Records::from_items(["parameter", "n_unique", "n_scenarios", "values"], &summary)?.emit(format)
}
