//! Hard failure conditions surfaced by a lookup.
//!
//! Only two things stop a section from producing a result: the source table
//! could not be obtained, or the identifier column could not be located.
//! Everything else (missing display fields, unparsable cells, zero matches)
//! degrades the result instead of failing it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Network, access or payload failure while fetching a source table.
    #[error("source '{location}' unavailable: {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// A required logical column resolved neither by name nor by position.
    #[error("column '{field}' not found (headers found: {})", format_headers(.headers))]
    ColumnNotFound { field: String, headers: Vec<String> },
}

impl LookupError {
    pub fn source_unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        LookupError::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable name of the condition.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::SourceUnavailable { .. } => "source-unavailable",
            LookupError::ColumnNotFound { .. } => "column-not-found",
        }
    }
}

fn format_headers(headers: &[String]) -> String {
    if headers.is_empty() {
        "none".to_string()
    } else {
        headers
            .iter()
            .map(|h| format!("'{h}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
