#![forbid(unsafe_code)]

//! Core domain model and business logic for the Tangjeon prescription engine.
//!
//! This crate provides:
//! - Domain types (templates, ingredients, adjustments, dispensing plans)
//! - Template catalog and fuzzy name matching
//! - Compound formula resolution and max-dosage merging
//! - Dosage and decoction water arithmetic
//! - Configuration and logging setup

pub mod types;
pub mod error;
pub mod composition;
pub mod matcher;
pub mod merge;
pub mod resolver;
pub mod catalog;
pub mod formula;
pub mod adjustment;
pub mod herb_order;
pub mod dosage;
pub mod config;
pub mod logging;
pub mod engine;

// Re-export commonly used types
pub use error::{AmbiguousTerm, Error, Result};
pub use types::*;
pub use catalog::{sample_catalog, TemplateCatalog};
pub use config::{Config, DecoctionConfig};
pub use herb_order::HerbOrder;
pub use matcher::{MatchOutcome, TemplateMatcher};
pub use composition::{format_composition, is_compound, tokenize};
pub use formula::normalize_formula;
pub use adjustment::parse_adjustments;
pub use engine::compute;
