// src/error.rs
// =============================================================================
// Errors that stop a whole check run.
//
// Only problems with the document itself or with the configuration end up
// here. Anything that goes wrong with a single link (timeouts, SSL, DNS,
// unresolvable relative links) is recorded as data in the report instead.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    /// The document could not be treated as text.
    #[error("cannot extract links: {reason}")]
    Extraction { reason: String },

    /// The configured base URL does not parse.
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be built (e.g. TLS backend failure).
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl CheckError {
    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::Extraction {
            reason: reason.into(),
        }
    }
}
