//! Polars frame reading/writing and column extraction helpers.

use std::fmt::Display;
use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;
#[cfg(feature = "parquet")]
use polars::prelude::{ParquetReader, ParquetWriter};
use watm_core::{WatmError, WatmResult};

pub(crate) fn storage_err<E: Display>(context: impl Display) -> impl FnOnce(E) -> WatmError {
    move |err| WatmError::Storage(format!("{context}: {err}"))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

pub fn read_frame(path: &Path) -> WatmResult<DataFrame> {
    let extension = extension_of(path);
    let mut file = File::open(path).map_err(storage_err(format!("opening {}", path.display())))?;

    match extension.as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => ParquetReader::new(&mut file)
            .finish()
            .map_err(storage_err(format!("reading Parquet file {}", path.display()))),
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(WatmError::Storage(format!(
            "parquet support is disabled; rebuild with the 'parquet' feature to read {}",
            path.display()
        ))),
        "csv" => CsvReader::new(&mut file)
            .has_header(true)
            .finish()
            .map_err(storage_err(format!("reading CSV file {}", path.display()))),
        _ => Err(WatmError::Storage(format!(
            "unsupported file extension '{}'; use .csv or .parquet",
            extension
        ))),
    }
}

pub fn write_frame(df: &mut DataFrame, path: &Path) -> WatmResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file =
        File::create(path).map_err(storage_err(format!("creating {}", path.display())))?;
    match extension_of(path).as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => ParquetWriter::new(&mut file)
            .finish(df)
            .map(|_| ())
            .map_err(storage_err("writing Parquet file")),
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(WatmError::Storage(
            "parquet support is disabled; rebuild with the 'parquet' feature".into(),
        )),
        "csv" => CsvWriter::new(&mut file)
            .finish(df)
            .map_err(storage_err("writing CSV file")),
        _ => Err(WatmError::Storage(format!(
            "unsupported output extension for {}; use .csv or .parquet",
            path.display()
        ))),
    }
}

pub(crate) fn column<'a>(df: &'a DataFrame, name: &str, table: &str) -> WatmResult<&'a Series> {
    df.column(name).map_err(|_| {
        WatmError::Storage(format!("table '{table}' has no column '{name}'"))
    })
}

pub(crate) fn as_text(series: &Series) -> WatmResult<Series> {
    series
        .cast(&DataType::Utf8)
        .map_err(storage_err(format!("casting column '{}' to text", series.name())))
}

pub(crate) fn as_float(series: &Series) -> WatmResult<Series> {
    series
        .cast(&DataType::Float64)
        .map_err(storage_err(format!("casting column '{}' to Float64", series.name())))
}

pub(crate) fn as_int(series: &Series) -> WatmResult<Series> {
    series
        .cast(&DataType::Int64)
        .map_err(storage_err(format!("casting column '{}' to Int64", series.name())))
}

pub(crate) fn text_values(series: &Series) -> WatmResult<Vec<Option<String>>> {
    let cast = as_text(series)?;
    let values = cast.utf8().map_err(storage_err("reading text column"))?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

pub(crate) fn float_values(series: &Series) -> WatmResult<Vec<Option<f64>>> {
    let cast = as_float(series)?;
    let values = cast.f64().map_err(storage_err("reading float column"))?;
    Ok(values.into_iter().collect())
}

pub(crate) fn int_values(series: &Series) -> WatmResult<Vec<Option<i64>>> {
    let cast = as_int(series)?;
    let values = cast.i64().map_err(storage_err("reading integer column"))?;
    Ok(values.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn csv_round_trip_through_write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("time.csv");
        let mut df = df![
            "step" => &[0i64, 1, 2],
            "time" => &[2020.0f64, 2020.5, 2021.0],
        ]
        .unwrap();
        write_frame(&mut df, &path).unwrap();
        let back = read_frame(&path).unwrap();
        assert_eq!(back.height(), 3);
        assert_eq!(
            float_values(back.column("time").unwrap()).unwrap()[1],
            Some(2020.5)
        );
        assert_eq!(int_values(back.column("step").unwrap()).unwrap()[2], Some(2));
    }

    #[test]
    fn unknown_extension_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.xlsx");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(read_frame(&path), Err(WatmError::Storage(_))));
    }

    #[test]
    fn numeric_columns_cast_to_text() {
        let df = df!["id" => &[3i64, 4]].unwrap();
        let ids = text_values(df.column("id").unwrap()).unwrap();
        assert_eq!(ids, vec![Some("3".to_string()), Some("4".to_string())]);
    }
}
