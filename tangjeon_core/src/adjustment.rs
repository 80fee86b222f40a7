//! Manual herb adjustment parsing.
//!
//! Free text such as `녹용37-인삼30+백출20` is scanned left to right for
//! `[sign]name amount` tokens. No sign or `+` adds, `-` subtracts. Text that
//! does not form a token is ignored.

use crate::types::Adjustment;
use once_cell::sync::Lazy;
use regex::Regex;

static ADJUSTMENT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([+-]?)([가-힣]+)(\d+(?:\.\d+)?)").expect("adjustment pattern is valid")
});

/// Parse an adjustment string into signed per-herb changes
pub fn parse_adjustments(input: &str) -> Vec<Adjustment> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    ADJUSTMENT_TOKEN
        .captures_iter(input)
        .map(|cap| {
            let sign = cap.get(1).map_or("", |m| m.as_str());
            let name = cap.get(2).map_or("", |m| m.as_str());
            let amount = cap
                .get(3)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0);

            Adjustment {
                herb_name: name.to_string(),
                amount,
                is_add: sign != "-",
            }
        })
        .collect()
}
