//! Conversion of query results back into polars frames for file output.

use std::path::Path;

use polars::prelude::*;
use watm_core::{ParamValue, SeriesFrame, WatmResult, SCENARIO_ID};

use crate::frame::{storage_err, write_frame};

/// Builds a long-form polars frame with the same columns as
/// [`SeriesFrame::column_names`].
pub fn series_frame_to_dataframe(frame: &SeriesFrame) -> WatmResult<DataFrame> {
    let rows = frame.rows();
    let mut columns = vec![Series::new(
        SCENARIO_ID,
        rows.iter().map(|r| r.scenario_id.clone()).collect::<Vec<_>>(),
    )];
    if frame.is_multi_variable() {
        columns.push(Series::new(
            "variable",
            rows.iter()
                .map(|r| r.variable.clone().unwrap_or_default())
                .collect::<Vec<_>>(),
        ));
    }
    columns.push(Series::new(
        "step",
        rows.iter().map(|r| r.step).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        "time",
        rows.iter().map(|r| r.time).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        "value",
        rows.iter().map(|r| r.value).collect::<Vec<_>>(),
    ));

    for (idx, name) in frame.param_names().iter().enumerate() {
        let cells: Vec<&ParamValue> = rows.iter().filter_map(|r| r.params.get(idx)).collect();
        let series = if cells.iter().all(|v| v.is_number()) {
            Series::new(
                name,
                cells.iter().filter_map(|v| v.as_f64()).collect::<Vec<_>>(),
            )
        } else {
            Series::new(
                name,
                cells.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            )
        };
        columns.push(series);
    }

    DataFrame::new(columns).map_err(storage_err("assembling series frame"))
}

/// Writes a query result as CSV or Parquet, chosen by file extension.
pub fn write_series_frame(frame: &SeriesFrame, path: &Path) -> WatmResult<()> {
    let mut df = series_frame_to_dataframe(frame)?;
    write_frame(&mut df, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::read_frame;
    use tempfile::tempdir;
    use watm_core::SeriesRow;

    fn sample() -> SeriesFrame {
        let rows = vec![
            SeriesRow {
                scenario_id: "sc_0".into(),
                variable: Some("a".into()),
                step: 0,
                time: 2020.0,
                value: 1.5,
                params: vec![1.0.into(), "A".into()],
            },
            SeriesRow {
                scenario_id: "sc_1".into(),
                variable: Some("b".into()),
                step: 0,
                time: 2020.0,
                value: 2.5,
                params: vec![2.0.into(), "B".into()],
            },
        ];
        SeriesFrame::new(
            vec!["a".into(), "b".into()],
            vec!["P1".into(), "P2".into()],
            rows,
        )
    }

    #[test]
    fn dataframe_carries_discriminator_and_params() {
        let df = series_frame_to_dataframe(&sample()).unwrap();
        assert_eq!(
            df.get_column_names(),
            vec!["scenario_id", "variable", "step", "time", "value", "P1", "P2"]
        );
        assert_eq!(df.column("P1").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("P2").unwrap().dtype(), &DataType::Utf8);
    }

    #[test]
    fn writes_csv_output() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("series.csv");
        write_series_frame(&sample(), &out).unwrap();
        let back = read_frame(&out).unwrap();
        assert_eq!(back.height(), 2);
        assert_eq!(back.width(), 7);
    }
}
