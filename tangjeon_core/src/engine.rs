//! Prescription computation pipeline.
//!
//! Runs one recomputation from the host's inputs:
//! - Normalize the formula expression and match every term
//! - Merge the matched templates by maximum dosage
//! - Scale by dose count and apply manual adjustments
//! - Derive packs, brewing water and the dose-count recommendation
//!
//! Every call is independent; nothing is kept between computations except
//! the catalog's resolved-template cache.

use crate::adjustment::parse_adjustments;
use crate::catalog::TemplateCatalog;
use crate::config::DecoctionConfig;
use crate::dosage::{build_plan, final_ingredients, recommended_doses, total_dosage};
use crate::formula::{normalize_formula, resolve_expression};
use crate::herb_order::HerbOrder;
use crate::merge::merge_templates;
use crate::types::{PrescriptionComputation, PrescriptionInputs};
use crate::Result;

/// Compute the full prescription record for `inputs`
///
/// Fails only when a formula term is ambiguous or unknown. Everything else
/// (malformed compositions, unparseable adjustments, inner compound
/// problems) degrades to best-effort output.
pub fn compute(
    inputs: &PrescriptionInputs,
    catalog: &TemplateCatalog,
    herb_order: &HerbOrder,
    decoction: &DecoctionConfig,
) -> Result<PrescriptionComputation> {
    let formula = normalize_formula(&inputs.formula);
    tracing::debug!("Computing prescription for {:?}", formula);

    let resolved = resolve_expression(&formula, catalog)?;
    let merged = merge_templates(resolved.iter().copied());

    let adjustments = parse_adjustments(&inputs.adjustment);
    let finals = final_ingredients(&merged, inputs.total_doses, &adjustments, herb_order);

    let recommended = recommended_doses(
        total_dosage(&merged),
        inputs.days,
        decoction.target_grams_per_dose,
    );
    if let Some(doses) = recommended {
        tracing::info!(
            "Per-dose total {}g exceeds {}g, suggesting {} doses",
            total_dosage(&merged),
            decoction.target_grams_per_dose,
            doses
        );
    }

    let plan = build_plan(
        &merged,
        &finals,
        inputs.total_doses,
        inputs.days,
        inputs.doses_per_day,
        inputs.pack_volume_ml,
        decoction,
    );

    Ok(PrescriptionComputation {
        formula,
        merged,
        final_ingredients: finals,
        recommended_doses: recommended,
        plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FormulaTemplate, Ingredient, UNMATCHED_SORT_KEY};
    use crate::Error;

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::new(vec![
            FormulaTemplate::new(1, "소시호탕", "황금:10/인삼:6"),
            FormulaTemplate::new(2, "반하사심탕", "황금:6/반하:8"),
            FormulaTemplate::new(3, "반하후박탕", "반하:8/후박:6"),
            FormulaTemplate::new(4, "소청룡탕", "마황:6"),
        ])
    }

    fn inputs(formula: &str) -> PrescriptionInputs {
        PrescriptionInputs {
            formula: formula.into(),
            total_doses: 10.0,
            days: 10,
            doses_per_day: 2,
            pack_volume_ml: 100,
            adjustment: String::new(),
        }
    }

    fn run(inputs: &PrescriptionInputs, catalog: &TemplateCatalog) -> Result<PrescriptionComputation> {
        compute(inputs, catalog, &HerbOrder::default(), &DecoctionConfig::default())
    }

    fn grams(computation: &PrescriptionComputation, herb: &str) -> Option<i64> {
        computation
            .final_ingredients
            .iter()
            .find(|f| f.herb_name == herb)
            .map(|f| f.total_grams)
    }

    #[test]
    fn test_worked_example() {
        crate::logging::init_test();
        let computation = run(&inputs("소시호 반하사심"), &catalog()).unwrap();

        assert_eq!(computation.formula, "소시호+반하사심");
        assert_eq!(
            computation.merged,
            vec![
                Ingredient::new("황금", 10.0),
                Ingredient::new("반하", 8.0),
                Ingredient::new("인삼", 6.0),
            ]
        );
        assert_eq!(grams(&computation, "황금"), Some(100));
        assert_eq!(grams(&computation, "인삼"), Some(60));
        assert_eq!(grams(&computation, "반하"), Some(80));

        let plan = &computation.plan;
        assert_eq!(plan.total_dosage, 24.0);
        assert_eq!(plan.final_total_grams, 240);
        assert_eq!(plan.total_packs, 20);
        assert_eq!(plan.water_volume_ml, 2688);
        assert_eq!(computation.recommended_doses, None);
    }

    #[test]
    fn test_final_list_follows_herb_order() {
        let order = HerbOrder::from_pairs([("인삼", 1), ("반하", 2)]);
        let computation = compute(
            &inputs("소시호+반하사심"),
            &catalog(),
            &order,
            &DecoctionConfig::default(),
        )
        .unwrap();

        let names: Vec<_> = computation
            .final_ingredients
            .iter()
            .map(|f| f.herb_name.as_str())
            .collect();
        assert_eq!(names, vec!["인삼", "반하", "황금"]);
        assert_eq!(computation.final_ingredients[2].sort_key, UNMATCHED_SORT_KEY);
    }

    #[test]
    fn test_recomputation_is_identical() {
        let catalog = catalog();
        let request = inputs("<소시호*1.5 반하사심>");

        let first = run(&request, &catalog).unwrap();
        let second = run(&request, &catalog).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_multiplier_doubles_every_herb() {
        let computation = run(&inputs("소시호*2"), &catalog()).unwrap();

        assert_eq!(
            computation.merged,
            vec![Ingredient::new("황금", 20.0), Ingredient::new("인삼", 12.0)]
        );
    }

    #[test]
    fn test_multiplier_applies_before_merge() {
        // 반하사심 황금 6 * 2 = 12 beats 소시호 황금 10
        let computation = run(&inputs("소시호 반하사심*2"), &catalog()).unwrap();
        assert_eq!(computation.merged[0], Ingredient::new("반하", 16.0));
        assert_eq!(computation.merged[1], Ingredient::new("황금", 12.0));
    }

    #[test]
    fn test_adjustments_never_leave_empty_entries() {
        let mut request = inputs("소시호 반하사심");
        request.adjustment = "-인삼60 -반하100 녹용37".into();

        let computation = run(&request, &catalog()).unwrap();

        assert_eq!(grams(&computation, "인삼"), None);
        assert_eq!(grams(&computation, "반하"), None);
        assert_eq!(grams(&computation, "녹용"), Some(37));
        assert!(computation.final_ingredients.iter().all(|f| f.total_grams > 0));
        assert_eq!(computation.plan.final_total_grams, 137);
    }

    #[test]
    fn test_fractional_subtract_removes_herb() {
        let mut request = inputs("소시호");
        request.adjustment = "-인삼59.6".into();

        let computation = run(&request, &catalog()).unwrap();

        assert_eq!(grams(&computation, "인삼"), None);
        assert!(computation.final_ingredients.iter().all(|f| f.total_grams > 0));
        assert_eq!(computation.plan.final_total_grams, 100);
    }

    #[test]
    fn test_detached_multiplier_fails() {
        let err = run(&inputs("소시호 *2"), &catalog()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown formulas: *2");
    }

    #[test]
    fn test_ambiguity_reports_all_terms() {
        let err = run(&inputs("반하 소"), &catalog()).unwrap_err();

        match err {
            Error::AmbiguousReference(terms) => assert_eq!(terms.len(), 2),
            other => panic!("expected ambiguity error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_formula_fails() {
        let err = run(&inputs("소시호 육미지황"), &catalog()).unwrap_err();
        assert!(err.is_reference_error());
        assert_eq!(err.to_string(), "Unknown formulas: 육미지황");
    }

    #[test]
    fn test_cyclic_compound_terminates() {
        let catalog = TemplateCatalog::new(vec![
            FormulaTemplate::new(1, "갑탕", "을+감초탕"),
            FormulaTemplate::new(2, "을탕", "갑+대조탕"),
            FormulaTemplate::new(3, "감초탕", "감초:4"),
            FormulaTemplate::new(4, "대조탕", "대조:6"),
        ]);

        let computation = run(&inputs("갑"), &catalog).unwrap();
        assert_eq!(
            computation.merged,
            vec![Ingredient::new("대조", 6.0), Ingredient::new("감초", 4.0)]
        );
    }

    #[test]
    fn test_recommendation_for_heavy_formula() {
        let catalog = TemplateCatalog::new(vec![FormulaTemplate::new(
            1,
            "대탕",
            "숙지황:40/당귀:40/천궁:40",
        )]);
        let mut request = inputs("대탕");
        request.days = 15;

        let computation = run(&request, &catalog).unwrap();
        // 15 * 100 / 120
        assert_eq!(computation.recommended_doses, Some(12.5));
        // Advisory only
        assert_eq!(computation.plan.total_doses, 10.0);
    }

    #[test]
    fn test_empty_formula_still_applies_adjustments() {
        let mut request = inputs("   ");
        request.adjustment = "감초10".into();

        let computation = run(&request, &catalog()).unwrap();
        assert!(computation.merged.is_empty());
        assert_eq!(grams(&computation, "감초"), Some(10));
        assert_eq!(computation.plan.total_dosage, 0.0);
    }
}
