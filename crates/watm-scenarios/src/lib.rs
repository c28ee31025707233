//! Scenario selection for the WATM query stack.
//!
//! Resolves parameter filters against the scenario table and summarizes
//! the parameter space for discovery endpoints.

pub mod resolve;
pub mod summary;

pub use resolve::{is_unconstrained, resolve_scenarios};
pub use summary::{param_summary, param_values, ParamSummary};
