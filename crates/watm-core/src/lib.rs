//! # watm-core: scenario dataset model
//!
//! Shared types for querying the outputs of the water-resources simulation
//! model: scenario parameter tables, the time axis, per-variable series,
//! filters over scenario parameters and the long-form [`SeriesFrame`] that
//! queries produce.
//!
//! The dataset is immutable. Everything here is either loaded once and read
//! concurrently ([`Catalog`]) or produced per query ([`SeriesFrame`]).

pub mod error;
pub mod filter;
pub mod frame;
pub mod source;
pub mod table;

pub use error::{WatmError, WatmResult};
pub use filter::{parse_filters, Filter, Filters, ParamValue, TimeWindow};
pub use frame::{SeriesFrame, SeriesRow};
pub use source::{InMemorySource, SeriesSource};
pub use table::{
    Catalog, ScenarioTable, SeriesPoint, TimeTable, VariableNameMap, VariableSeries,
    RESERVED_TABLES, SCENARIO_ID,
};
