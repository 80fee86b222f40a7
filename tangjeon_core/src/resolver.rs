//! Compound formula (합방) resolution.
//!
//! A composition containing `+` lists other templates instead of herbs.
//! Each part is looked up, its own composition resolved recursively, and
//! the results merged by maximum dosage.
//!
//! Problems inside a compound composition never fail the computation:
//! cycles, unknown parts and ambiguous parts are skipped with a warning.

use crate::composition::{is_compound, tokenize, COMPOUND_SEPARATOR};
use crate::matcher::{MatchOutcome, TemplateMatcher};
use crate::merge::DosageMap;
use crate::types::Ingredient;
use std::collections::HashSet;

/// Resolve a composition string to a flat list of unique ingredients
///
/// `visited` holds the names already being expanded on the current branch.
/// It is copied for every recursive call so sibling parts never see each
/// other's entries.
pub fn resolve_composition(
    composition: &str,
    matcher: &TemplateMatcher<'_>,
    visited: &HashSet<String>,
) -> Vec<Ingredient> {
    if !is_compound(composition) {
        let mut acc = DosageMap::new();
        acc.merge_all(&tokenize(composition), 1.0);
        return acc.into_vec();
    }

    let mut acc = DosageMap::new();

    for part in composition.split(COMPOUND_SEPARATOR).map(str::trim) {
        if part.is_empty() {
            continue;
        }
        if visited.contains(part) {
            tracing::warn!("Circular formula reference skipped: {}", part);
            continue;
        }

        let template = match matcher.lookup_inner(part) {
            MatchOutcome::Found(template) => template,
            MatchOutcome::NotFound => {
                tracing::warn!("Formula reference not found, skipped: {}", part);
                continue;
            }
            MatchOutcome::Ambiguous(candidates) => {
                tracing::warn!(
                    "Ambiguous formula reference skipped: {} ({})",
                    part,
                    candidates.join(", ")
                );
                continue;
            }
        };

        if visited.contains(&template.name) {
            tracing::warn!(
                "Circular formula reference skipped: {} ({})",
                part,
                template.name
            );
            continue;
        }

        let mut branch = visited.clone();
        branch.insert(part.to_string());
        branch.insert(template.name.clone());

        let herbs = resolve_composition(&template.composition, matcher, &branch);
        tracing::debug!("Resolved {} to {} herbs", template.name, herbs.len());
        acc.merge_all(&herbs, 1.0);
    }

    acc.into_vec()
}
