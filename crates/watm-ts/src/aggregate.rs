//! Per-step ensemble statistics across scenarios.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use watm_core::SeriesFrame;

/// z value for a two-sided 95% interval under the normal approximation.
///
/// Used for every group size; small ensembles get intervals that are too
/// narrow compared to a t-distribution.
pub const Z_95: f64 = 1.96;

/// Ensemble statistics for one variable at one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub step: i64,
    pub time: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
    pub n_scenarios: usize,
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Default)]
struct StepBucket<'a> {
    time: f64,
    values: Vec<f64>,
    scenarios: BTreeSet<&'a str>,
}

/// Groups rows by `(variable, step)` and summarizes each group.
///
/// Output is ascending by step within each variable; variables come out in
/// name order, which is the order the retriever concatenates them in.
pub fn aggregate(frame: &SeriesFrame) -> Vec<StepStatistics> {
    let mut buckets: BTreeMap<(Option<&str>, i64), StepBucket> = BTreeMap::new();
    for row in frame.rows() {
        let entry = buckets
            .entry((row.variable.as_deref(), row.step))
            .or_default();
        entry.time = row.time;
        entry.values.push(row.value);
        entry.scenarios.insert(row.scenario_id.as_str());
    }

    buckets
        .into_iter()
        .map(|((variable, step), mut bucket)| {
            bucket.values.sort_by(f64::total_cmp);
            let values = &bucket.values;
            let mean = mean(values);
            let std = sample_std(values, mean);
            let n = bucket.scenarios.len();
            let se = if n > 1 { std / (n as f64).sqrt() } else { 0.0 };
            StepStatistics {
                variable: variable.map(str::to_string),
                step,
                time: bucket.time,
                mean,
                std,
                min: values.first().copied().unwrap_or(f64::NAN),
                max: values.last().copied().unwrap_or(f64::NAN),
                p05: percentile(values, 0.05),
                p95: percentile(values, 0.95),
                n_scenarios: n,
                se,
                ci_lower: mean - Z_95 * se,
                ci_upper: mean + Z_95 * se,
            }
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two values.
pub(crate) fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Nearest-rank percentile over values that are already sorted ascending.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
