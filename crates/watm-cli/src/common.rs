//! Output formats and writers shared across commands.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::ValueEnum;
use csv::Writer;
use serde::Serialize;
use serde_json::Value;
use tabwriter::TabWriter;

/// Output format for tabular/structured data.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable aligned table
    #[default]
    Table,
    /// JSON array (pipe-friendly, structured)
    Json,
    /// JSON Lines - one JSON object per line
    Jsonl,
    /// Comma-separated values
    Csv,
}

/// Ordered columns plus one JSON object per row.
///
/// JSON output uses the objects as-is; table and CSV output follow
/// `headers` so columns come out in a stable, meaningful order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    pub headers: Vec<String>,
    pub rows: Vec<Value>,
}

impl Records {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>, rows: Vec<Value>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Serializes each item to a JSON object.
    pub fn from_items<T: Serialize, S: Into<String>>(
        headers: impl IntoIterator<Item = S>,
        items: &[T],
    ) -> Result<Self> {
        let rows = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .context("serializing output rows")?;
        Ok(Self::new(headers, rows))
    }

    pub fn emit(&self, format: OutputFormat) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match format {
            OutputFormat::Table => write_table(&self.headers, &self.rows, &mut out)?,
            OutputFormat::Json => write_json(&self.rows, &mut out, true)?,
            OutputFormat::Jsonl => write_jsonl(&self.rows, &mut out)?,
            OutputFormat::Csv => write_csv(&self.headers, &self.rows, &mut out)?,
        }
        out.flush()?;
        Ok(())
    }
}

/// Write data as JSON to the given writer.
pub fn write_json<W: Write, T: Serialize>(
    data: &T,
    writer: &mut W,
    pretty: bool,
) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, data).map_err(io::Error::other)?;
    } else {
        serde_json::to_writer(&mut *writer, data).map_err(io::Error::other)?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Write data as JSON Lines (one JSON object per line) to the given writer.
pub fn write_jsonl<W: Write, T: Serialize>(data: &[T], writer: &mut W) -> io::Result<()> {
    for item in data {
        serde_json::to_writer(&mut *writer, item).map_err(io::Error::other)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Write JSON objects as CSV, one column per header.
pub fn write_csv<W: Write>(headers: &[String], rows: &[Value], writer: &mut W) -> io::Result<()> {
    let mut csv = Writer::from_writer(writer);
    csv.write_record(headers)?;
    for row in rows {
        csv.write_record(headers.iter().map(|h| cell(row.get(h.as_str()))))?;
    }
    csv.flush()
}

pub fn write_table<W: Write>(headers: &[String], rows: &[Value], writer: &mut W) -> io::Result<()> {
    let mut table = TabWriter::new(Vec::new()).padding(2);
    writeln!(table, "{}", headers.join("\t"))?;
    for row in rows {
        let values: Vec<String> = headers.iter().map(|h| cell(row.get(h.as_str()))).collect();
        writeln!(table, "{}", values.join("\t"))?;
    }
    table.flush()?;
    let rendered = table.into_inner().map_err(|e| io::Error::other(e.to_string()))?;
    writer.write_all(&rendered)
}

/// Plain-text rendering of one JSON cell.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell(Some(item)))
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Records {
        Records::new(
            ["name", "values", "n"],
            vec![
                json!({"name": "P1", "values": [1.0, 2.0], "n": 2}),
                json!({"name": "a,b", "values": [], "n": null}),
            ],
        )
    }

    #[test]
    fn csv_follows_header_order_and_quotes() {
        let r = records();
        let mut out = Vec::new();
        write_csv(&r.headers, &r.rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "name,values,n\nP1,1.0; 2.0,2\n\"a,b\",,\n");
    }

    #[test]
    fn csv_quotes_line_breaks_inside_cells() {
        let rows = vec![json!({"scenario_id": "sc\n0", "note": "a\rb"})];
        let mut out = Vec::new();
        write_csv(&["scenario_id".into(), "note".into()], &rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "scenario_id,note\n\"sc\n0\",\"a\rb\"\n");
    }

    #[test]
    fn table_aligns_columns() {
        let r = records();
        let mut out = Vec::new();
        write_table(&r.headers, &r.rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("name"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn jsonl_writes_one_object_per_line() {
        let r = records();
        let mut out = Vec::new();
        write_jsonl(&r.rows, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}
