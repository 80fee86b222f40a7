//! Core domain types for the decoction prescription engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Formula templates as supplied by the template repository
//! - Ingredients and resolved templates
//! - Formula references, manual adjustments and final dispensing records

use serde::{Deserialize, Serialize};

// ============================================================================
// Template Types
// ============================================================================

/// Identifier of a formula template in the external repository
pub type TemplateId = i64;

/// A formula template as loaded from the template repository (처방 정의)
///
/// `composition` is either a plain ingredient list (`황금:10/인삼:6`) or a
/// compound expression referencing other templates (`소시호탕+반하사심탕`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormulaTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub composition: String,
}

impl FormulaTemplate {
    pub fn new(id: TemplateId, name: impl Into<String>, composition: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            alias: None,
            category: None,
            source: None,
            composition: composition.into(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.alias = if alias.trim().is_empty() {
            None
        } else {
            Some(alias)
        };
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// True if `name` equals this template's name or alias exactly
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.alias.as_deref() == Some(name)
    }

    /// True if the template's name or alias starts with `prefix`
    pub fn name_starts_with(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
            || self
                .alias
                .as_deref()
                .is_some_and(|alias| alias.starts_with(prefix))
    }
}

// ============================================================================
// Ingredient Types
// ============================================================================

/// One herb with its per-dose amount in grams
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub dosage: f64,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, dosage: f64) -> Self {
        Self {
            name: name.into(),
            dosage,
        }
    }
}

/// A template with its composition fully expanded to ingredients
///
/// Ingredient names are unique within `ingredients`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResolvedTemplate {
    pub id: TemplateId,
    pub name: String,
    pub alias: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

impl ResolvedTemplate {
    /// Sum of all per-dose amounts
    pub fn total_dosage(&self) -> f64 {
        self.ingredients.iter().map(|i| i.dosage).sum()
    }
}

/// One top-level term of a user formula expression
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParsedReference {
    pub search_name: String,
    pub multiplier: f64,
}

/// Merged per-dose composition, sorted by descending dosage
pub type MergedComposition = Vec<Ingredient>;

// ============================================================================
// Adjustment and Dispensing Types
// ============================================================================

/// A manual change to the final amount of one herb
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Adjustment {
    pub herb_name: String,
    pub amount: f64,
    pub is_add: bool,
}

/// Sort key given to herbs missing from the herb ordering table
pub const UNMATCHED_SORT_KEY: i64 = i64::MAX;

/// A herb in the final dispensing list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalIngredient {
    pub herb_name: String,
    pub sort_key: i64,
    pub total_grams: i64,
}

/// Totals derived for brewing and packaging
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DispensingPlan {
    /// Sum of per-dose grams of the merged composition
    pub total_dosage: f64,
    pub total_doses: f64,
    pub days: u32,
    pub doses_per_day: u32,
    pub total_packs: u32,
    pub pack_volume_ml: u32,
    pub final_total_grams: i64,
    pub water_volume_ml: i64,
}

/// Inputs supplied by the host on every recomputation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionInputs {
    pub formula: String,
    pub total_doses: f64,
    pub days: u32,
    pub doses_per_day: u32,
    pub pack_volume_ml: u32,
    #[serde(default)]
    pub adjustment: String,
}

impl Default for PrescriptionInputs {
    fn default() -> Self {
        Self {
            formula: String::new(),
            total_doses: 15.0,
            days: 15,
            doses_per_day: 2,
            pack_volume_ml: 100,
            adjustment: String::new(),
        }
    }
}

/// Everything the persistence/printing layer needs from one computation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionComputation {
    /// Normalized formula expression (`+`-joined)
    pub formula: String,
    pub merged: MergedComposition,
    pub final_ingredients: Vec<FinalIngredient>,
    /// Advisory dose count when the per-dose total is too heavy
    pub recommended_doses: Option<f64>,
    #[serde(flatten)]
    pub plan: DispensingPlan,
}
