//! Storage seam between the query engine and the dataset store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{WatmError, WatmResult};
use crate::table::{SeriesPoint, VariableSeries};

/// Read-only access to per-variable tables.
///
/// `keep` is applied to each row's scenario id while the table is read, so
/// implementations only materialize rows for the selected scenarios.
pub trait SeriesSource: Send + Sync {
    /// Storage keys of every variable table, in no particular order.
    fn storage_keys(&self) -> WatmResult<Vec<String>>;

    fn has_series(&self, storage_key: &str) -> bool;

    fn load_series(
        &self,
        storage_key: &str,
        keep: &dyn Fn(&str) -> bool,
    ) -> WatmResult<VariableSeries>;
}

/// Variable tables held in memory, used by tests and embedders that build
/// datasets programmatically.
#[derive(Debug, Default)]
pub struct InMemorySource {
    series: BTreeMap<String, Vec<SeriesPoint>>,
    loads: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, storage_key: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        self.series.insert(storage_key.into(), points);
        self
    }

    /// Number of `load_series` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SeriesSource for InMemorySource {
    fn storage_keys(&self) -> WatmResult<Vec<String>> {
        Ok(self.series.keys().cloned().collect())
    }

    fn has_series(&self, storage_key: &str) -> bool {
        self.series.contains_key(storage_key)
    }

    fn load_series(
        &self,
        storage_key: &str,
        keep: &dyn Fn(&str) -> bool,
    ) -> WatmResult<VariableSeries> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let points = self
            .series
            .get(storage_key)
            .ok_or_else(|| WatmError::VariableNotFound {
                variable: storage_key.to_string(),
                storage_key: storage_key.to_string(),
            })?;
        Ok(VariableSeries::new(
            points
                .iter()
                .filter(|point| keep(&point.scenario_id))
                .cloned()
                .collect(),
        ))
    }
}
