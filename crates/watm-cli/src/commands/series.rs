use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tracing::info;
use watm_core::SeriesFrame;
use watm_query::ScenarioQueryEngine;
use watm_ts::{SeriesRequest, WideFrame};

use crate::cli::{window, QueryArgs};
use crate::common::{OutputFormat, Records};

pub fn series(
    engine: &ScenarioQueryEngine,
    variables: &[String],
    query: &QueryArgs,
    no_params: bool,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let request = SeriesRequest::new(variables.iter().cloned())
        .with_filters(query.filters()?)
        .with_time_window(query.window()?)
        .with_params(!no_params);
    let frame = engine.get_series(&request)?;

    match out {
        Some(path) => {
            watm_io::write_series_frame(&frame, path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(rows = frame.len(), path = %path.display(), "wrote series");
            println!("Wrote {} rows to {}", frame.len(), path.display());
            Ok(())
        }
        None => frame_records(&frame).emit(format),
    }
}

pub fn aggregate(
    engine: &ScenarioQueryEngine,
    variables: &[String],
    query: &QueryArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = SeriesRequest::new(variables.iter().cloned())
        .with_filters(query.filters()?)
        .with_time_window(query.window()?)
        .with_params(false);
    let stats = engine.aggregate_series(&request)?;

    let mut headers = Vec::new();
    if request.normalized_variables().len() > 1 {
        headers.push("variable");
    }
    headers.extend([
        "step",
        "time",
        "mean",
        "std",
        "min",
        "max",
        "p05",
        "p95",
        "n_scenarios",
        "se",
        "ci_lower",
        "ci_upper",
    ]);
    Records::from_items(headers, &stats)?.emit(format)
}

pub fn pivot(
    engine: &ScenarioQueryEngine,
    variable: &str,
    query: &QueryArgs,
    by: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let wide = engine.get_series_pivoted(variable, &query.filters()?, query.window()?, by)?;
    wide_records(&wide).emit(format)
}

pub fn stats(
    engine: &ScenarioQueryEngine,
    variable: &str,
    scenario: &str,
    start: Option<f64>,
    end: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let headers = [
        "peak_value",
        "peak_time",
        "valley_value",
        "valley_time",
        "mean",
        "std",
        "trend",
        "range",
        "data_points",
    ];
    match engine.series_statistics(variable, scenario, window(start, end)?)? {
        Some(stats) => Records::from_items(headers, &[stats])?.emit(format),
        None => {
            eprintln!("No data for '{variable}' in scenario '{scenario}' within the window");
            Records::new(headers, Vec::new()).emit(format)
        }
    }
}

/// Long-form rows with parameters flattened into their own columns.
fn frame_records(frame: &SeriesFrame) -> Records {
    let headers = frame.column_names();
    let rows = frame
        .rows()
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            obj.insert("scenario_id".into(), json!(row.scenario_id));
            if let Some(variable) = &row.variable {
                obj.insert("variable".into(), json!(variable));
            }
            obj.insert("step".into(), json!(row.step));
            obj.insert("time".into(), json!(row.time));
            obj.insert("value".into(), json!(row.value));
            for (name, value) in frame.param_names().iter().zip(&row.params) {
                obj.insert(name.clone(), json!(value));
            }
            Value::Object(obj)
        })
        .collect();
    Records::new(headers, rows)
}

fn wide_records(wide: &WideFrame) -> Records {
    let headers = std::iter::once("time".to_string()).chain(wide.columns.iter().cloned());
    let rows = wide
        .index
        .iter()
        .zip(&wide.values)
        .map(|(time, cells)| {
            let mut obj = Map::new();
            obj.insert("time".into(), json!(time));
            for (column, value) in wide.columns.iter().zip(cells) {
                obj.insert(column.clone(), json!(value));
            }
            Value::Object(obj)
        })
        .collect();
    Records::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use watm_core::SeriesRow;

    #[test]
    fn frame_rows_flatten_params() {
        let frame = SeriesFrame::new(
            vec!["v".into()],
            vec!["P1".into()],
            vec![SeriesRow {
                scenario_id: "sc_0".into(),
                variable: None,
                step: 0,
                time: 2020.0,
                value: 1.5,
                params: vec![2.0.into()],
            }],
        );
        let records = frame_records(&frame);
        assert_eq!(
            records.headers,
            vec!["scenario_id", "step", "time", "value", "P1"]
        );
        assert_eq!(records.rows[0]["P1"], json!(2.0));
    }

    #[test]
    fn wide_rows_keep_missing_cells_null() {
        let wide = WideFrame {
            index: vec![2020.0],
            columns: vec!["sc_0".into(), "sc_1".into()],
            values: vec![vec![Some(1.0), None]],
        };
        let records = wide_records(&wide);
        assert_eq!(records.headers, vec!["time", "sc_0", "sc_1"]);
        assert_eq!(records.rows[0]["sc_1"], Value::Null);
    }
}
