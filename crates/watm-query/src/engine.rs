//! The query facade handed to transports.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use watm_core::{
    Catalog, Filters, ParamValue, SeriesFrame, SeriesSource, TimeWindow, WatmResult,
    RESERVED_TABLES,
};
use watm_io::DatasetStore;
use watm_scenarios::{
    is_unconstrained, param_summary, param_values, resolve_scenarios, ParamSummary,
};
use watm_ts::{
    aggregate, fetch_scenario_series, fetch_series, pivot, sensitivity_score, series_statistics,
    SensitivityMetric, SensitivityScore, SeriesRequest, SeriesStatistics, StepStatistics,
    WideFrame,
};

use crate::cache::{CacheStats, QueryCache};
use crate::config::EngineConfig;
use crate::key::CacheKey;

/// Inputs of a sensitivity run.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityRequest {
    pub vary_param: String,
    /// Filters on the other parameters; the varied one is left open.
    pub fixed: Filters,
    /// Variables to score; `None` scores every variable in the dataset.
    pub variables: Option<Vec<String>>,
    pub time_window: Option<TimeWindow>,
    pub metric: SensitivityMetric,
    pub top_n: Option<usize>,
}

impl SensitivityRequest {
    pub fn new(vary_param: impl Into<String>) -> Self {
        Self {
            vary_param: vary_param.into(),
            fixed: Filters::new(),
            variables: None,
            time_window: None,
            metric: SensitivityMetric::default(),
            top_n: None,
        }
    }
}

/// Outcome of filling the default tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrewarmReport {
    pub warmed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Scenario query engine over one immutable dataset.
///
/// Safe to share across threads; all mutable state lives in the cache.
pub struct ScenarioQueryEngine {
    catalog: Catalog,
    source: Arc<dyn SeriesSource>,
    cache: QueryCache,
    config: EngineConfig,
    default_variables: BTreeSet<String>,
}

impl ScenarioQueryEngine {
    /// Builds an engine and, when configured, pre-warms the default tier.
    pub fn new(
        catalog: Catalog,
        source: Arc<dyn SeriesSource>,
        config: EngineConfig,
    ) -> WatmResult<Self> {
        let mut engine = Self {
            catalog,
            source,
            cache: QueryCache::new(config.max_size),
            config,
            default_variables: BTreeSet::new(),
        };
        engine.default_variables = engine
            .list_variables()?
            .into_iter()
            .take(engine.config.prewarm_limit)
            .collect();
        info!(
            scenarios = engine.catalog.scenarios.len(),
            steps = engine.catalog.time.len(),
            default_tier = engine.default_variables.len(),
            max_size = engine.config.max_size,
            "scenario query engine ready"
        );
        if engine.config.prewarm_on_startup {
            engine.prewarm();
        }
        Ok(engine)
    }

    /// Opens a dataset directory and builds an engine over it.
    pub fn open(dir: impl AsRef<Path>, config: EngineConfig) -> WatmResult<Self> {
        let store = DatasetStore::open(dir.as_ref())?;
        let catalog = store.load_catalog()?;
        Self::new(catalog, Arc::new(store), config)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolve_scenarios(&self, filters: &Filters) -> WatmResult<BTreeSet<String>> {
        resolve_scenarios(&self.catalog.scenarios, filters)
    }

    /// Long-form rows for `request`, served from the cache when possible.
    ///
    /// The returned frame is the caller's own copy.
    pub fn get_series(&self, request: &SeriesRequest) -> WatmResult<SeriesFrame> {
        let key = CacheKey::for_request(request)?;
        if let Some(hit) = self.cache.get(&key) {
            return Ok((*hit).clone());
        }
        let frame = match self.from_default_tier(request)? {
            Some(frame) => frame,
            None => fetch_series(&self.catalog, self.source.as_ref(), request)?,
        };
        self.cache.insert(key, Arc::new(frame.clone()));
        Ok(frame)
    }

    /// Wide form of one variable, columns per `pivot_param` level or per
    /// scenario when no parameter is given.
    pub fn get_series_pivoted(
        &self,
        variable: &str,
        filters: &Filters,
        window: Option<TimeWindow>,
        pivot_param: Option<&str>,
    ) -> WatmResult<WideFrame> {
        if let Some(name) = pivot_param {
            self.catalog.scenarios.require_param(name)?;
        }
        let request = SeriesRequest::new([variable])
            .with_filters(filters.clone())
            .with_time_window(window)
            .with_params(pivot_param.is_some());
        pivot(&self.get_series(&request)?, pivot_param)
    }

    pub fn aggregate_series(&self, request: &SeriesRequest) -> WatmResult<Vec<StepStatistics>> {
        Ok(aggregate(&self.get_series(request)?))
    }

    /// Display names of every variable table, sorted.
    pub fn list_variables(&self) -> WatmResult<Vec<String>> {
        let names: BTreeSet<String> = self
            .source
            .storage_keys()?
            .iter()
            .filter(|key| !RESERVED_TABLES.contains(&key.as_str()))
            .map(|key| self.catalog.names.display_name(key).to_string())
            .collect();
        Ok(names.into_iter().collect())
    }

    pub fn get_param_summary(&self, filters: &Filters) -> WatmResult<Vec<ParamSummary>> {
        param_summary(&self.catalog.scenarios, filters)
    }

    pub fn param_values(&self) -> BTreeMap<String, Vec<ParamValue>> {
        param_values(&self.catalog.scenarios)
    }

    /// `(step, time)` pairs in step order.
    pub fn time_axis(&self) -> Vec<(i64, f64)> {
        self.catalog.time.iter().collect()
    }

    /// Trajectory summary for one scenario; `None` when the window holds no
    /// points.
    pub fn series_statistics(
        &self,
        variable: &str,
        scenario_id: &str,
        window: Option<TimeWindow>,
    ) -> WatmResult<Option<SeriesStatistics>> {
        let frame =
            fetch_scenario_series(&self.catalog, self.source.as_ref(), variable, scenario_id, window)?;
        Ok(series_statistics(frame.rows()))
    }

    /// Scores each variable's response to `vary_param`, most sensitive first.
    pub fn sensitivity(&self, request: &SensitivityRequest) -> WatmResult<Vec<SensitivityScore>> {
        self.catalog.scenarios.require_param(&request.vary_param)?;
        self.resolve_scenarios(&request.fixed)?;
        let variables = match &request.variables {
            Some(variables) => variables.clone(),
            None => self.list_variables()?,
        };
        debug!(
            vary = %request.vary_param,
            metric = %request.metric,
            variables = variables.len(),
            "running sensitivity"
        );

        let scored = variables
            .par_iter()
            .map(|variable| {
                let series = SeriesRequest::new([variable.as_str()])
                    .with_filters(request.fixed.clone())
                    .with_time_window(request.time_window);
                let frame = self.get_series(&series)?;
                sensitivity_score(variable, &frame, &request.vary_param, request.metric)
            })
            .collect::<WatmResult<Vec<_>>>()?;

        let mut scores: Vec<SensitivityScore> = scored.into_iter().flatten().collect();
        scores.sort_by(|a, b| b.sensitivity.total_cmp(&a.sensitivity));
        if let Some(n) = request.top_n {
            scores.truncate(n);
        }
        Ok(scores)
    }

    /// Loads the default-tier snapshots that are not cached yet.
    ///
    /// A variable that fails to load is logged and reported, never fatal.
    pub fn prewarm(&self) -> PrewarmReport {
        let started = Instant::now();
        let outcomes: Vec<(String, WatmResult<()>)> = self
            .default_variables
            .par_iter()
            .filter(|variable| !self.cache.has_default(variable))
            .map(|variable| {
                let result = self.load_default(variable).map(|_| ());
                (variable.clone(), result)
            })
            .collect();

        let mut report = PrewarmReport::default();
        for (variable, result) in outcomes {
            match result {
                Ok(()) => report.warmed.push(variable),
                Err(err) => {
                    warn!(variable = %variable, error = %err, "pre-warm failed");
                    report.failed.push((variable, err.to_string()));
                }
            }
        }
        info!(
            warmed = report.warmed.len(),
            failed = report.failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "default tier pre-warmed"
        );
        report
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("query cache cleared");
    }

    /// Serves an eligible request from the variable's all-scenario snapshot.
    ///
    /// `AnyOf` sets may exclude levels, so the snapshot is restricted to the
    /// resolved scenarios, then to the window, and parameters are dropped
    /// when not requested.
    fn from_default_tier(&self, request: &SeriesRequest) -> WatmResult<Option<SeriesFrame>> {
        if !is_unconstrained(&request.filters) {
            return Ok(None);
        }
        let variables = request.normalized_variables();
        let [variable] = variables.as_slice() else {
            return Ok(None);
        };
        if !self.default_variables.contains(variable) {
            return Ok(None);
        }

        let selected = self.resolve_scenarios(&request.filters)?;
        let snapshot = match self.cache.default_snapshot(variable) {
            Some(snapshot) => snapshot,
            None => match self.load_default(variable) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    debug!(variable = %variable, error = %err, "default snapshot unavailable");
                    return Ok(None);
                }
            },
        };

        let mut frame = (*snapshot).clone();
        if !request.filters.is_empty() {
            frame = frame.restrict_scenarios(&selected);
        }
        if let Some(window) = &request.time_window {
            frame = frame.restrict_time(window);
        }
        if !request.include_params {
            frame = frame.without_params();
        }
        Ok(Some(frame))
    }

    fn load_default(&self, variable: &str) -> WatmResult<Arc<SeriesFrame>> {
        let frame = Arc::new(fetch_series(
            &self.catalog,
            self.source.as_ref(),
            &SeriesRequest::new([variable]),
        )?);
        self.cache.insert_default(variable, Arc::clone(&frame));
        Ok(frame)
    }
}
