//! Series operations for the WATM query stack: retrieval from a
//! [`watm_core::SeriesSource`], per-step ensemble aggregation, wide
//! pivots, single-scenario statistics and parameter sensitivity.

pub mod aggregate;
pub mod pivot;
pub mod retrieve;
pub mod sensitivity;
pub mod stats;

pub use aggregate::{aggregate, StepStatistics, Z_95};
pub use pivot::{pivot, WideFrame};
pub use retrieve::{fetch_scenario_series, fetch_series, SeriesRequest};
pub use sensitivity::{sensitivity_score, SensitivityMetric, SensitivityScore};
pub use stats::{series_statistics, SeriesStatistics};
