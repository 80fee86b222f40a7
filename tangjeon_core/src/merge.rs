//! Ingredient merging by maximum dosage.
//!
//! When the same herb appears in several formulas of a combination, it is
//! dosed at the highest amount any of them prescribes, never the sum.

use crate::types::{Ingredient, MergedComposition, ResolvedTemplate};
use std::collections::HashMap;

/// Insertion-ordered accumulator keeping one dosage per herb name
///
/// Every insert keeps the larger of the stored and offered dosage, so the
/// map can never hold a name twice or a summed amount.
#[derive(Clone, Debug, Default)]
pub struct DosageMap {
    entries: Vec<Ingredient>,
    index: HashMap<String, usize>,
}

impl DosageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one herb, keeping the maximum dosage seen for its name
    pub fn merge_max(&mut self, name: &str, dosage: f64) {
        match self.index.get(name) {
            Some(&idx) => {
                let entry = &mut self.entries[idx];
                if dosage > entry.dosage {
                    entry.dosage = dosage;
                }
            }
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(Ingredient::new(name, dosage));
            }
        }
    }

    /// Merge every ingredient scaled by `multiplier`
    pub fn merge_all<'a, I>(&mut self, ingredients: I, multiplier: f64)
    where
        I: IntoIterator<Item = &'a Ingredient>,
    {
        for ingredient in ingredients {
            self.merge_max(&ingredient.name, ingredient.dosage * multiplier);
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&idx| self.entries[idx].dosage)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order
    pub fn into_vec(self) -> Vec<Ingredient> {
        self.entries
    }

    /// Entries sorted by descending dosage; ties keep first-seen order
    pub fn into_sorted(self) -> MergedComposition {
        let mut entries = self.entries;
        entries.sort_by(|a, b| {
            b.dosage
                .partial_cmp(&a.dosage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries
    }
}

/// Merge resolved templates, each scaled by its multiplier, into one per-dose list
pub fn merge_templates<'a, I>(templates: I) -> MergedComposition
where
    I: IntoIterator<Item = (&'a ResolvedTemplate, f64)>,
{
    let mut acc = DosageMap::new();
    for (template, multiplier) in templates {
        tracing::debug!(
            "Merging {} ({} herbs) at x{}",
            template.name,
            template.ingredients.len(),
            multiplier
        );
        acc.merge_all(&template.ingredients, multiplier);
    }
    acc.into_sorted()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(name: &str, herbs: &[(&str, f64)]) -> ResolvedTemplate {
        ResolvedTemplate {
            id: 0,
            name: name.into(),
            alias: None,
            ingredients: herbs.iter().map(|(n, d)| Ingredient::new(*n, *d)).collect(),
        }
    }

    #[test]
    fn test_merge_keeps_maximum_not_sum() {
        let a = resolved("A", &[("황금", 10.0), ("인삼", 6.0)]);
        let b = resolved("B", &[("황금", 6.0), ("반하", 8.0)]);

        let merged = merge_templates([(&a, 1.0), (&b, 1.0)]);

        assert_eq!(
            merged,
            vec![
                Ingredient::new("황금", 10.0),
                Ingredient::new("반하", 8.0),
                Ingredient::new("인삼", 6.0),
            ]
        );
    }

    #[test]
    fn test_multiplier_applies_before_merge() {
        let a = resolved("A", &[("황금", 5.0), ("감초", 2.0)]);
        let b = resolved("B", &[("황금", 8.0)]);

        let merged = merge_templates([(&a, 2.0), (&b, 1.0)]);

        assert_eq!(merged[0], Ingredient::new("황금", 10.0));
        assert_eq!(merged[1], Ingredient::new("감초", 4.0));
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let mut map = DosageMap::new();
        map.merge_max("대조", 4.0);
        map.merge_max("생강", 4.0);
        map.merge_max("시호", 12.0);

        let names: Vec<_> = map.into_sorted().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["시호", "대조", "생강"]);
    }

    #[test]
    fn test_lower_dosage_does_not_replace() {
        let mut map = DosageMap::new();
        map.merge_max("황금", 9.0);
        map.merge_max("황금", 3.0);

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("황금"), Some(9.0));
    }
}
