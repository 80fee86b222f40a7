//! Fuzzy template matching.
//!
//! Names are typed without their formula-type suffix most of the time
//! (`소시호` for `소시호탕`), so lookup runs in tiers:
//!
//! 1. Exact match on name or alias
//! 2. Name + each configured suffix (`탕`, `산`, `환`, `음`)
//! 3. Prefix match on name or alias, only if tier 2 found nothing
//!
//! The first tier that produces a candidate wins; tiers are never combined.

use crate::types::FormulaTemplate;

/// Default formula-type suffixes tried in tier 2
pub const DEFAULT_SUFFIXES: [&str; 4] = ["탕", "산", "환", "음"];

/// Outcome of matching one name against the catalog
#[derive(Clone, Debug, PartialEq)]
pub enum MatchOutcome<'a> {
    Found(&'a FormulaTemplate),
    NotFound,
    /// Several templates fit; carries their display names
    Ambiguous(Vec<String>),
}

/// Matches user-entered names against a template list
#[derive(Clone, Debug)]
pub struct TemplateMatcher<'a> {
    templates: &'a [FormulaTemplate],
    suffixes: &'a [String],
}

impl<'a> TemplateMatcher<'a> {
    pub fn new(templates: &'a [FormulaTemplate], suffixes: &'a [String]) -> Self {
        Self {
            templates,
            suffixes,
        }
    }

    /// Full user-facing lookup where ambiguity is reported
    pub fn lookup(&self, search_name: &str) -> MatchOutcome<'a> {
        if let Some(template) = self.exact(search_name) {
            return MatchOutcome::Found(template);
        }

        let mut candidates = Vec::new();
        for suffix in self.suffixes {
            let with_suffix = format!("{}{}", search_name, suffix);
            for (idx, template) in self.templates.iter().enumerate() {
                if template.is_named(&with_suffix) && !candidates.contains(&idx) {
                    candidates.push(idx);
                }
            }
        }

        if candidates.is_empty() {
            for (idx, template) in self.templates.iter().enumerate() {
                if template.name_starts_with(search_name) {
                    candidates.push(idx);
                }
            }
        }

        self.outcome(candidates)
    }

    /// Lookup used inside compound compositions
    ///
    /// Only the exact and suffix tiers apply. The exact name is tried first,
    /// then each suffix in order; the first form that matches anything
    /// decides. A form matching more than one template is ambiguous in
    /// either tier.
    pub fn lookup_inner(&self, name: &str) -> MatchOutcome<'a> {
        let forms = std::iter::once(name.to_string())
            .chain(self.suffixes.iter().map(|suffix| format!("{}{}", name, suffix)));

        for form in forms {
            let candidates = self.named(&form);
            if !candidates.is_empty() {
                return self.outcome(candidates);
            }
        }

        MatchOutcome::NotFound
    }

    fn named(&self, name: &str) -> Vec<usize> {
        self.templates
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_named(name))
            .map(|(idx, _)| idx)
            .collect()
    }

    fn exact(&self, name: &str) -> Option<&'a FormulaTemplate> {
        self.templates.iter().find(|t| t.is_named(name))
    }

    fn outcome(&self, candidates: Vec<usize>) -> MatchOutcome<'a> {
        match candidates.as_slice() {
            [] => MatchOutcome::NotFound,
            [only] => MatchOutcome::Found(&self.templates[*only]),
            many => MatchOutcome::Ambiguous(
                many.iter()
                    .map(|&idx| self.templates[idx].name.clone())
                    .collect(),
            ),
        }
    }
}
