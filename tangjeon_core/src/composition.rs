//! Composition string tokenizer.
//!
//! Grammar: `Herb1:Dosage1/Herb2:Dosage2/...`. The parser is tolerant:
//! segments without a name or a dosage are dropped, and a dosage that is not
//! a number counts as 0 g.

use crate::types::Ingredient;

/// Separator between compound references (`소시호탕+반하사심탕`)
pub const COMPOUND_SEPARATOR: char = '+';

/// True if the composition references other templates instead of listing herbs
pub fn is_compound(composition: &str) -> bool {
    composition.contains(COMPOUND_SEPARATOR)
}

/// Split a composition string into ingredients
pub fn tokenize(composition: &str) -> Vec<Ingredient> {
    composition
        .split('/')
        .filter_map(|segment| {
            let (name, dosage) = segment.split_once(':')?;
            let name = name.trim();
            let dosage = dosage.trim();
            if name.is_empty() || dosage.is_empty() {
                tracing::debug!("Dropping malformed composition segment {:?}", segment);
                return None;
            }
            Some(Ingredient::new(name, parse_leading_number(dosage)))
        })
        .collect()
}

/// Render ingredients back into the composition grammar
pub fn format_composition(ingredients: &[Ingredient]) -> String {
    ingredients
        .iter()
        .map(|i| format!("{}:{}", i.name, i.dosage))
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse the longest numeric prefix of `s` (`"7.5g"` → 7.5), or 0 if none
///
/// Dosages are typed by hand and often carry a unit suffix.
pub fn parse_leading_number(s: &str) -> f64 {
    let s = s.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (idx, ch) in s.char_indices() {
        match ch {
            '0'..='9' => {
                seen_digit = true;
                end = idx + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
            }
            '-' | '+' if idx == 0 => {}
            _ => break,
        }
    }

    if !seen_digit {
        return 0.0;
    }
    s[..end].parse::<f64>().unwrap_or(0.0)
}
