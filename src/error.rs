//! Structured error types for the Folio layout engine.
//!
//! Only fatal conditions live here. Findings that leave the run intact
//! (overflow, unresolved references, duplicate ids, skipped content) are
//! reported as [`crate::layout::Diagnostic`] values instead.

use thiserror::Error;

use crate::layout::LmId;

/// The unified error type returned by all public Folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// JSON input failed to parse as a valid Folio document.
    #[error("Failed to parse document: {source}{}", hint_suffix(.hint))]
    ParseError {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A configuration file was malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An XML configuration file could not be read.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A Position was replayed against a layout manager that did not issue it.
    #[error("position issued by layout manager {found} replayed against {expected}")]
    PositionMismatch { expected: LmId, found: LmId },

    /// A replayed span names a child its parent does not own.
    #[error("layout manager {parent} has no child {child}")]
    UnknownChild { parent: LmId, child: LmId },

    /// Any other broken layout invariant.
    #[error("internal layout error: {0}")]
    Internal(String),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the Folio document schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::ParseError { source: e, hint }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
