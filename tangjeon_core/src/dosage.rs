//! Dosage and decoction arithmetic.
//!
//! Scales the merged per-dose composition by the number of doses (첩),
//! applies manual adjustments, and derives pack count and brewing water.

use crate::config::DecoctionConfig;
use crate::herb_order::HerbOrder;
use crate::types::{Adjustment, DispensingPlan, FinalIngredient, Ingredient};

/// Sum of per-dose grams
pub fn total_dosage(merged: &[Ingredient]) -> f64 {
    merged.iter().map(|i| i.dosage).sum()
}

/// Advisory dose count keeping one dose near `target_grams_per_dose`
///
/// Returns `None` unless the per-dose total exceeds the target. Rounded to
/// one decimal. Never applied automatically.
pub fn recommended_doses(total_dosage: f64, days: u32, target_grams_per_dose: f64) -> Option<f64> {
    if total_dosage > target_grams_per_dose {
        let raw = f64::from(days) * target_grams_per_dose / total_dosage;
        Some((raw * 10.0).round() / 10.0)
    } else {
        None
    }
}

/// Per-herb gram totals in first-seen order
#[derive(Debug, Default)]
struct HerbTotals {
    entries: Vec<(String, f64)>,
}

impl HerbTotals {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    fn set(&mut self, name: &str, grams: f64) {
        match self.position(name) {
            Some(idx) => self.entries[idx].1 = grams,
            None => self.entries.push((name.to_string(), grams)),
        }
    }

    fn apply(&mut self, adjustment: &Adjustment) {
        let current = self
            .position(&adjustment.herb_name)
            .map_or(0.0, |idx| self.entries[idx].1);

        if adjustment.is_add {
            self.set(&adjustment.herb_name, current + adjustment.amount);
            return;
        }

        let remaining = current - adjustment.amount;
        if remaining.round() <= 0.0 {
            if let Some(idx) = self.position(&adjustment.herb_name) {
                tracing::debug!("Adjustment removes {}", adjustment.herb_name);
                self.entries.remove(idx);
            }
        } else {
            self.set(&adjustment.herb_name, remaining);
        }
    }
}

/// Scale, adjust and order the final herb list
///
/// Herbs whose rounded amount is zero or below are removed entirely. The
/// result is sorted by the herb ordering table, unknown herbs last.
pub fn final_ingredients(
    merged: &[Ingredient],
    total_doses: f64,
    adjustments: &[Adjustment],
    herb_order: &HerbOrder,
) -> Vec<FinalIngredient> {
    let mut totals = HerbTotals::default();
    for herb in merged {
        totals.set(&herb.name, (herb.dosage * total_doses).round());
    }

    for adjustment in adjustments {
        totals.apply(adjustment);
    }

    let mut finals: Vec<FinalIngredient> = totals
        .entries
        .into_iter()
        .map(|(name, grams)| (name, grams.round() as i64))
        .filter(|(name, grams)| {
            if *grams <= 0 {
                tracing::debug!("Dropping {} with no remaining amount", name);
            }
            *grams > 0
        })
        .map(|(name, grams)| FinalIngredient {
            sort_key: herb_order.sort_key(&name),
            total_grams: grams,
            herb_name: name,
        })
        .collect();

    finals.sort_by_key(|f| f.sort_key);
    finals
}

/// Water needed to brew `final_total_grams` into `total_packs` packs
///
/// `herbs * factor + pack_volume * (packs + 1) + base`, rounded.
pub fn water_volume_ml(
    final_total_grams: i64,
    pack_volume_ml: u32,
    total_packs: u32,
    decoction: &DecoctionConfig,
) -> i64 {
    let water = final_total_grams as f64 * decoction.herb_water_factor
        + f64::from(pack_volume_ml) * (f64::from(total_packs) + 1.0)
        + decoction.base_water_ml;
    water.round() as i64
}

/// Derive the dispensing totals from the merged and final lists
pub fn build_plan(
    merged: &[Ingredient],
    finals: &[FinalIngredient],
    total_doses: f64,
    days: u32,
    doses_per_day: u32,
    pack_volume_ml: u32,
    decoction: &DecoctionConfig,
) -> DispensingPlan {
    let final_total_grams: i64 = finals.iter().map(|f| f.total_grams).sum();
    let total_packs = days.saturating_mul(doses_per_day);

    DispensingPlan {
        total_dosage: total_dosage(merged),
        total_doses,
        days,
        doses_per_day,
        total_packs,
        pack_volume_ml,
        final_total_grams,
        water_volume_ml: water_volume_ml(final_total_grams, pack_volume_ml, total_packs, decoction),
    }
}
