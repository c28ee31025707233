//! # watm-query: cached scenario queries
//!
//! [`ScenarioQueryEngine`] answers series, aggregation, pivot and
//! sensitivity queries over an immutable WATM dataset. Results are cached
//! in two tiers (see [`cache`]) keyed by a canonical request hash (see
//! [`key`]).
//!
//! ```ignore
//! use watm_query::{ScenarioQueryEngine, WatmConfig};
//! use watm_ts::SeriesRequest;
//!
//! let config = WatmConfig::load()?;
//! let engine = ScenarioQueryEngine::open(&config.dataset.dir, config.cache)?;
//! let frame = engine.get_series(&SeriesRequest::new(["YRB WSI"]))?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod key;

pub use cache::{CacheStats, QueryCache};
pub use config::{DatasetConfig, EngineConfig, WatmConfig};
pub use engine::{PrewarmReport, ScenarioQueryEngine, SensitivityRequest};
pub use key::CacheKey;
