use anyhow::Result;
use watm_query::{ScenarioQueryEngine, SensitivityRequest};
use watm_ts::SensitivityMetric;

use crate::cli::{parse_filter_arg, window};
use crate::common::{OutputFormat, Records};

pub struct SensitivityArgs<'a> {
    pub vary: &'a str,
    pub fixed: Option<&'a str>,
    pub variables: Option<&'a [String]>,
    pub metric: SensitivityMetric,
    pub top: Option<usize>,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

pub fn handle(
    engine: &ScenarioQueryEngine,
    args: SensitivityArgs<'_>,
    format: OutputFormat,
) -> Result<()> {
    let request = SensitivityRequest {
        vary_param: args.vary.to_string(),
        fixed: parse_filter_arg(args.fixed)?,
        variables: args.variables.map(<[String]>::to_vec),
        time_window: window(args.start, args.end)?,
        metric: args.metric,
        top_n: args.top,
    };
    let scores = engine.sensitivity(&request)?;
    if scores.is_empty() {
        eprintln!("No variable produced data for the selected scenarios");
    }
    Records::from_items(
        [
            "variable",
            "sensitivity",
            "mean_value",
            "std_value",
            "min_value",
            "max_value",
            "range_value",
            "cv",
            "n_scenarios",
            "n_param_values",
        ],
        &scores,
    )?
    .emit(format)
}
