//! How strongly a variable responds to one scenario parameter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use watm_core::{ParamValue, SeriesFrame, WatmError, WatmResult};

use crate::aggregate::{mean, percentile, sample_std};

/// Score reported for each variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMetric {
    /// Coefficient of variation of the group means, in percent.
    #[default]
    Cv,
    Range,
    /// Range as a percentage of the overall mean.
    RangePct,
    Std,
    /// p75 - p25 of the group means.
    Iqr,
}

impl FromStr for SensitivityMetric {
    type Err = WatmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cv" => Ok(Self::Cv),
            "range" => Ok(Self::Range),
            "range_pct" => Ok(Self::RangePct),
            "std" => Ok(Self::Std),
            "iqr" => Ok(Self::Iqr),
            other => Err(WatmError::InvalidRequest(format!(
                "unknown metric '{other}'; use cv, range, range_pct, std or iqr"
            ))),
        }
    }
}

impl fmt::Display for SensitivityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cv => "cv",
            Self::Range => "range",
            Self::RangePct => "range_pct",
            Self::Std => "std",
            Self::Iqr => "iqr",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityScore {
    pub variable: String,
    pub sensitivity: f64,
    pub mean_value: f64,
    pub std_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub range_value: f64,
    pub cv: f64,
    pub n_scenarios: usize,
    pub n_param_values: usize,
}

struct Group {
    sum: f64,
    count: usize,
    min: f64,
    max: f64,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

/// Scores `frame` (one variable, parameters joined) against `vary_param`.
///
/// Rows are grouped by the parameter's value; the spread of the group means
/// is the sensitivity. Returns `Ok(None)` for an empty frame.
pub fn sensitivity_score(
    variable: &str,
    frame: &SeriesFrame,
    vary_param: &str,
    metric: SensitivityMetric,
) -> WatmResult<Option<SensitivityScore>> {
    let position = frame
        .param_position(vary_param)
        .ok_or_else(|| WatmError::UnknownParameter {
            name: vary_param.to_string(),
            available: frame.param_names().to_vec(),
        })?;
    if frame.is_empty() {
        return Ok(None);
    }

    let mut groups: BTreeMap<&ParamValue, Group> = BTreeMap::new();
    for row in frame.rows() {
        let Some(level) = row.params.get(position) else {
            continue;
        };
        let group = groups.entry(level).or_default();
        group.sum += row.value;
        group.count += 1;
        group.min = group.min.min(row.value);
        group.max = group.max.max(row.value);
    }
    if groups.is_empty() {
        return Ok(None);
    }

    let mut means: Vec<f64> = groups
        .values()
        .map(|g| g.sum / g.count as f64)
        .collect();
    let overall_mean = mean(&means);
    let overall_std = sample_std(&means, overall_mean);
    let overall_min = groups.values().map(|g| g.min).fold(f64::INFINITY, f64::min);
    let overall_max = groups
        .values()
        .map(|g| g.max)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = overall_max - overall_min;
    let relative = |x: f64| {
        if overall_mean != 0.0 {
            x / overall_mean.abs() * 100.0
        } else {
            0.0
        }
    };

    means.sort_by(f64::total_cmp);
    let sensitivity = match metric {
        SensitivityMetric::Cv => relative(overall_std),
        SensitivityMetric::Range => range,
        SensitivityMetric::RangePct => relative(range),
        SensitivityMetric::Std => overall_std,
        SensitivityMetric::Iqr => percentile(&means, 0.75) - percentile(&means, 0.25),
    };

    Ok(Some(SensitivityScore {
        variable: variable.to_string(),
        sensitivity,
        mean_value: overall_mean,
        std_value: overall_std,
        min_value: overall_min,
        max_value: overall_max,
        range_value: range,
        cv: relative(overall_std),
        n_scenarios: frame.scenario_count(),
        n_param_values: groups.len(),
    }))
}
