use serde::Serialize;
use watm_core::SeriesRow;

use crate::aggregate::{mean, sample_std};

/// Summary of one scenario's trajectory for one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStatistics {
    pub peak_value: f64,
    pub peak_time: f64,
    pub valley_value: f64,
    pub valley_time: f64,
    pub mean: f64,
    pub std: f64,
    /// Change per time unit between the first and last point.
    pub trend: f64,
    pub range: f64,
    pub data_points: usize,
}

/// Statistics over rows ordered by step; `None` when there are no rows.
///
/// Ties for peak and valley go to the earliest point.
pub fn series_statistics(rows: &[SeriesRow]) -> Option<SeriesStatistics> {
    let first = rows.first()?;
    let last = rows.last()?;

    let mut peak = first;
    let mut valley = first;
    for row in rows {
        if row.value > peak.value {
            peak = row;
        }
        if row.value < valley.value {
            valley = row;
        }
    }

    let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
    let mean = mean(&values);
    let span = last.time - first.time;
    let trend = if rows.len() > 1 && span > 0.0 {
        (last.value - first.value) / span
    } else {
        0.0
    };

    Some(SeriesStatistics {
        peak_value: peak.value,
        peak_time: peak.time,
        valley_value: valley.value,
        valley_time: valley.time,
        mean,
        std: sample_std(&values, mean),
        trend,
        range: peak.value - valley.value,
        data_points: rows.len(),
    })
}
