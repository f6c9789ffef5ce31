//! Scrape-time error taxonomy.
//!
//! None of these abort the exporter; they are logged, counted and reported
//! alongside whatever observations the scrape still produced.

use ltos_common::{FetchError, FieldError};
use thiserror::Error;

use crate::parse::ParseError;

/// Why (part of) a scrape produced no observations.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The status document could not be fetched or decoded.
    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("Required field '{path}' is missing")]
    RequiredFieldMissing { path: String },

    #[error("Field '{path}' is {found}, expected {expected}")]
    FieldTypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Failed to parse '{path}': {source}")]
    SubParseFailed {
        path: String,
        #[source]
        source: ParseError,
    },
}

impl ScrapeError {
    /// Wrap a sub-parser failure for the field at `path`.
    pub fn sub_parse(path: impl Into<String>, source: ParseError) -> Self {
        Self::SubParseFailed {
            path: path.into(),
            source,
        }
    }

    /// Dotted document path the error refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            ScrapeError::FetchFailed(_) => None,
            ScrapeError::RequiredFieldMissing { path }
            | ScrapeError::FieldTypeMismatch { path, .. }
            | ScrapeError::SubParseFailed { path, .. } => Some(path),
        }
    }

    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::FetchFailed(_) => "fetch_failed",
            ScrapeError::RequiredFieldMissing { .. } => "required_field_missing",
            ScrapeError::FieldTypeMismatch { .. } => "field_type_mismatch",
            ScrapeError::SubParseFailed { .. } => "sub_parse_failed",
        }
    }
}

impl From<FieldError> for ScrapeError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Missing { path } => ScrapeError::RequiredFieldMissing { path },
            FieldError::TypeMismatch {
                path,
                expected,
                found,
            } => ScrapeError::FieldTypeMismatch {
                path,
                expected,
                found,
            },
        }
    }
}
