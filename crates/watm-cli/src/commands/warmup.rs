//! Repeated queries with timings, to see the cache at work.

use std::time::Instant;

use anyhow::Result;
use serde_json::json;
use tracing::info;
use watm_query::ScenarioQueryEngine;
use watm_ts::SeriesRequest;

use crate::common::{OutputFormat, Records};

pub fn handle(
    engine: &ScenarioQueryEngine,
    variables: &[String],
    rounds: usize,
    format: OutputFormat,
) -> Result<()> {
    let mut rows = Vec::with_capacity(rounds * variables.len());
    for round in 1..=rounds {
        for variable in variables {
            let started = Instant::now();
            let frame = engine.get_series(&SeriesRequest::new([variable.as_str()]))?;
            let elapsed = started.elapsed().as_secs_f64() * 1000.0;
            rows.push(json!({
                "round": round,
                "variable": variable,
                "rows": frame.len(),
                "elapsed_ms": (elapsed * 1000.0).round() / 1000.0,
            }));
        }
    }

    let stats = engine.cache_stats();
    info!(
        general = stats.general_size,
        default = stats.default_size,
        hits = stats.hits,
        misses = stats.misses,
        "cache after warmup"
    );
    Records::new(["round", "variable", "rows", "elapsed_ms"], rows).emit(format)?;
    eprintln!(
        "cache: {} general / {} max, {} default, {} hits, {} misses",
        stats.general_size, stats.max_size, stats.default_size, stats.hits, stats.misses
    );
    Ok(())
}
