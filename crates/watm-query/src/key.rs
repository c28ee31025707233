//! Canonical cache keys.
//!
//! A key is the lowercase hex SHA-256 of this JSON document:
//!
//! ```text
//! {"variables": [sorted, de-duplicated names],
//!  "filters": {name: "n:<f64 debug>" | "s:<text>" | [sorted rendered values]},
//!  "time_window": ["n:<start>", "n:<end>"] | null,
//!  "include_params": bool}
//! ```
//!
//! Single-element `AnyOf` sets render as `Equals`, numbers render through
//! their `f64` debug form with `-0.0` folded onto `0.0`, so requests that
//! select the same rows produce the same key regardless of how they were
//! spelled.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};
use watm_core::{Filter, ParamValue, WatmResult};
use watm_ts::SeriesRequest;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &SeriesRequest) -> WatmResult<Self> {
        let canonical = CanonicalRequest {
            variables: request.normalized_variables(),
            filters: request
                .filters
                .iter()
                .map(|(name, filter)| (name.as_str(), render_filter(filter)))
                .collect(),
            time_window: request
                .time_window
                .map(|w| [render_number(w.start()), render_number(w.end())]),
            include_params: request.include_params,
        };
        let bytes = serde_json::to_vec(&canonical)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct CanonicalRequest<'a> {
    variables: Vec<String>,
    filters: BTreeMap<&'a str, RenderedFilter>,
    time_window: Option<[String; 2]>,
    include_params: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RenderedFilter {
    One(String),
    Many(Vec<String>),
}

fn render_filter(filter: &Filter) -> RenderedFilter {
    match filter {
        Filter::Equals(value) => RenderedFilter::One(render_value(value)),
        Filter::AnyOf(values) if values.len() == 1 => {
            RenderedFilter::One(values.iter().map(render_value).collect())
        }
        // BTreeSet iteration is already in value order.
        Filter::AnyOf(values) => RenderedFilter::Many(values.iter().map(render_value).collect()),
    }
}

fn render_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Number(n) => render_number(*n),
        ParamValue::Text(text) => format!("s:{text}"),
    }
}

fn render_number(n: f64) -> String {
    let n = if n == 0.0 { 0.0 } else { n };
    format!("n:{n:?}")
}
