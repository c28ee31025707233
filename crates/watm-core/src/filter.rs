//! Parameter values, scenario filters and time windows.
//!
//! Filters arrive as JSON from the transport layer, e.g.
//! `{"Fertility Variation": 1.6, "Climate scenario": [1, 2]}`. A scalar
//! deserializes to [`Filter::Equals`] and an array to [`Filter::AnyOf`], so
//! the resolver branches on an explicit variant rather than on the runtime
//! shape of the value.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{WatmError, WatmResult};

/// A single scenario parameter value.
///
/// Numbers compare by value (`1` and `1.0` are the same parameter level) and
/// sort before text, which gives the total order needed for sets and maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(value) => Some(*value),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Number(_) => None,
            ParamValue::Text(text) => Some(text),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, ParamValue::Number(_))
    }
}

/// Collapses `-0.0` onto `0.0` so both hash and order identically.
pub(crate) fn normalize_number(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParamValue {}

impl PartialOrd for ParamValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParamValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ParamValue::Number(a), ParamValue::Number(b)) => {
                normalize_number(*a).total_cmp(&normalize_number(*b))
            }
            (ParamValue::Number(_), ParamValue::Text(_)) => Ordering::Less,
            (ParamValue::Text(_), ParamValue::Number(_)) => Ordering::Greater,
            (ParamValue::Text(a), ParamValue::Text(b)) => a.cmp(b),
        }
    }
}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ParamValue::Number(value) => {
                0u8.hash(state);
                normalize_number(*value).to_bits().hash(state);
            }
            ParamValue::Text(text) => {
                1u8.hash(state);
                text.hash(state);
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(value) => write!(f, "{value}"),
            ParamValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(f64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Constraint on one scenario parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    /// The parameter must equal this value.
    Equals(ParamValue),
    /// The parameter must take one of these values ("Any" logic).
    AnyOf(BTreeSet<ParamValue>),
}

impl Filter {
    pub fn equals(value: impl Into<ParamValue>) -> Self {
        Filter::Equals(value.into())
    }

    pub fn any_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Filter::AnyOf(values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, value: &ParamValue) -> bool {
        match self {
            Filter::Equals(expected) => expected == value,
            Filter::AnyOf(accepted) => accepted.contains(value),
        }
    }

    /// True for an `AnyOf` accepting at least two values.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Filter::AnyOf(accepted) if accepted.len() > 1)
    }
}

/// Parameter name -> constraint. Keys are kept sorted.
pub type Filters = BTreeMap<String, Filter>;

/// Parses the JSON filter object accepted by the query surface.
pub fn parse_filters(json: &str) -> WatmResult<Filters> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Filters::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Inclusive time range applied to the `time` column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    start: f64,
    end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> WatmResult<Self> {
        if start.is_nan() || end.is_nan() {
            return Err(WatmError::InvalidRequest(
                "time window bounds must be numbers".into(),
            ));
        }
        if start > end {
            return Err(WatmError::InvalidRequest(format!(
                "time window start {start} is after end {end}"
            )));
        }
        Ok(Self {
            start: normalize_number(start),
            end: normalize_number(end),
        })
    }

    /// Builds a window from optional bounds; a missing side is left open.
    pub fn from_bounds(start: Option<f64>, end: Option<f64>) -> WatmResult<Option<Self>> {
        match (start, end) {
            (None, None) => Ok(None),
            (start, end) => Self::new(
                start.unwrap_or(f64::NEG_INFINITY),
                end.unwrap_or(f64::INFINITY),
            )
            .map(Some),
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_floats_are_the_same_level() {
        assert_eq!(ParamValue::from(1i64), ParamValue::from(1.0));
        assert_eq!(ParamValue::from(-0.0), ParamValue::from(0.0));
        assert!(ParamValue::from(2.0) < ParamValue::from("A"));
    }

    #[test]
    fn scalar_json_is_equals_and_array_is_any_of() {
        let filters = parse_filters(r#"{"P1": 1, "P2": ["A", "B"], "P3": "x"}"#).unwrap();
        assert_eq!(filters["P1"], Filter::equals(1.0));
        assert_eq!(filters["P2"], Filter::any_of(["A", "B"]));
        assert_eq!(filters["P3"], Filter::equals("x"));
    }

    #[test]
    fn empty_filter_text_means_no_constraint() {
        assert!(parse_filters("  ").unwrap().is_empty());
        assert!(parse_filters("{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_filter_json_is_a_parse_error() {
        assert!(matches!(
            parse_filters("{\"P1\": }"),
            Err(WatmError::Parse(_))
        ));
    }

    #[test]
    fn any_of_matches_members_only() {
        let filter = Filter::any_of([1.6, 1.7]);
        assert!(filter.matches(&ParamValue::from(1.7)));
        assert!(!filter.matches(&ParamValue::from(1.8)));
        assert!(!Filter::AnyOf(BTreeSet::new()).matches(&ParamValue::from(1.6)));
    }

    #[test]
    fn only_two_or_more_levels_are_multi_valued() {
        assert!(Filter::any_of([1.6, 1.7]).is_multi_valued());
        assert!(!Filter::any_of([1.6]).is_multi_valued());
        assert!(!Filter::any_of([1, 1]).is_multi_valued());
        assert!(!Filter::AnyOf(BTreeSet::new()).is_multi_valued());
        assert!(!Filter::equals(1.6).is_multi_valued());
    }

    #[test]
    fn time_window_is_inclusive() {
        let window = TimeWindow::new(2020.0, 2050.0).unwrap();
        assert!(window.contains(2020.0));
        assert!(window.contains(2050.0));
        assert!(!window.contains(2050.5));
    }

    #[test]
    fn inverted_time_window_is_rejected() {
        assert!(matches!(
            TimeWindow::new(2050.0, 2020.0),
            Err(WatmError::InvalidRequest(_))
        ));
    }

    #[test]
    fn open_bounds_use_infinities() {
        let window = TimeWindow::from_bounds(Some(2030.0), None).unwrap().unwrap();
        assert!(window.contains(1.0e9));
        assert!(!window.contains(2029.0));
        assert!(TimeWindow::from_bounds(None, None).unwrap().is_none());
    }
}
