//! Error types for the tangjeon_core library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A formula term that matched more than one catalog template
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousTerm {
    pub term: String,
    pub candidates: Vec<String>,
}

impl fmt::Display for AmbiguousTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\": {}", self.term, self.candidates.join(", "))
    }
}

/// Core error type for tangjeon_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog loading or validation error
    #[error("Catalog error: {0}")]
    CatalogValidation(String),

    /// One or more formula terms matched several templates
    #[error("Ambiguous formula names, please enter the exact name:\n{}", format_ambiguous(.0))]
    AmbiguousReference(Vec<AmbiguousTerm>),

    /// One or more formula terms matched no template
    #[error("Unknown formulas: {}", .0.join(", "))]
    UnresolvedReference(Vec<String>),
}

fn format_ambiguous(terms: &[AmbiguousTerm]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// True for the user-facing formula reference errors.
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            Error::AmbiguousReference(_) | Error::UnresolvedReference(_)
        )
    }
}
