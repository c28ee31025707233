//! Unified error type for the WATM query stack
//!
//! Every library crate in the workspace reports failures through
//! [`WatmError`] so a transport layer can map each variant to a
//! user-facing response without string matching.
//!
//! # Example
//!
//! ```ignore
//! use watm_core::{WatmError, WatmResult};
//!
//! fn first_param(table: &ScenarioTable) -> WatmResult<&str> {
//!     table
//!         .param_names()
//!         .first()
//!         .map(String::as_str)
//!         .ok_or_else(|| WatmError::InvalidRequest("table has no parameters".into()))
//! }
//! ```

use thiserror::Error;

/// Unified error type for all WATM operations.
#[derive(Error, Debug)]
pub enum WatmError {
    /// A filter or pivot referenced a parameter that is not a scenario column.
    #[error("unknown parameter '{name}'; available: {}", .available.join(", "))]
    UnknownParameter { name: String, available: Vec<String> },

    /// A requested variable has no backing storage table.
    #[error("variable '{variable}' not found (storage key '{storage_key}')")]
    VariableNotFound {
        variable: String,
        storage_key: String,
    },

    /// A scenario id that does not exist in the scenario table.
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    /// A join that must be total found unmatched rows, or a table broke
    /// one of its load-time invariants.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// The request itself is malformed (empty variable list, inverted window, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Dataset store failures (missing directory, undecodable table, ...).
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using WatmError.
pub type WatmResult<T> = Result<T, WatmError>;

impl From<serde_json::Error> for WatmError {
    fn from(err: serde_json::Error) -> Self {
        WatmError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_parameter_lists_available_names() {
        let err = WatmError::UnknownParameter {
            name: "P9".into(),
            available: vec!["P1".into(), "P2".into()],
        };
        let text = err.to_string();
        assert!(text.contains("P9"));
        assert!(text.contains("P1, P2"));
    }

    #[test]
    fn variable_not_found_mentions_storage_key() {
        let err = WatmError::VariableNotFound {
            variable: "YRB WSI".into(),
            storage_key: "yrb_wsi".into(),
        };
        assert!(err.to_string().contains("yrb_wsi"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WatmError = io_err.into();
        assert!(matches!(err, WatmError::Io(_)));
    }

    #[test]
    fn json_error_becomes_parse() {
        let err: WatmError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, WatmError::Parse(_)));
    }
}
