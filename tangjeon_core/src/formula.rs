//! Formula expression parsing.
//!
//! A prescription is typed as template names separated by spaces or `+`,
//! each optionally scaled with `*factor`: `백인 소시호*1.5 반하사심`.

use crate::catalog::TemplateCatalog;
use crate::composition::{parse_leading_number, COMPOUND_SEPARATOR};
use crate::error::AmbiguousTerm;
use crate::matcher::MatchOutcome;
use crate::types::{ParsedReference, ResolvedTemplate};
use crate::{Error, Result};

/// Marker between a template name and its multiplier
pub const MULTIPLIER_MARKER: char = '*';

/// Canonical `+`-joined form of a formula expression
///
/// Strips one enclosing `<...>` pair, turns whitespace runs into `+`,
/// collapses repeated `+` and trims `+` from both ends.
pub fn normalize_formula(input: &str) -> String {
    let mut s = input.trim();
    s = s.strip_prefix('<').unwrap_or(s);
    s = s.strip_suffix('>').unwrap_or(s);

    s.split(|c: char| c.is_whitespace() || c == COMPOUND_SEPARATOR)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("+")
}

/// Split a normalized expression into references
///
/// A multiplier that is missing, unparseable or not positive counts as 1.0.
/// A term with no name before its `*` (`*2`, typed as `소시호 *2`) keeps the
/// whole term as its search name so it fails to match instead of vanishing.
pub fn parse_references(normalized: &str) -> Vec<ParsedReference> {
    normalized
        .split(COMPOUND_SEPARATOR)
        .filter(|term| !term.is_empty())
        .map(|term| {
            let (name, multiplier) = match term.rsplit_once(MULTIPLIER_MARKER) {
                Some((name, factor)) if !name.trim().is_empty() => {
                    (name.trim(), parse_multiplier(factor))
                }
                Some(_) => (term, 1.0),
                None => (term.trim(), 1.0),
            };
            ParsedReference {
                search_name: name.to_string(),
                multiplier,
            }
        })
        .collect()
}

/// True if `name` is a bare multiplier left over from a detached `*factor`
fn is_nameless(name: &str) -> bool {
    name.starts_with(MULTIPLIER_MARKER)
}

fn parse_multiplier(factor: &str) -> f64 {
    let value = parse_leading_number(factor);
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// Resolve every reference of a normalized expression against the catalog
///
/// All terms are matched before failing: every ambiguous term is reported
/// together, and unknown terms are reported only when nothing is ambiguous.
pub fn resolve_expression<'c>(
    normalized: &str,
    catalog: &'c TemplateCatalog,
) -> Result<Vec<(&'c ResolvedTemplate, f64)>> {
    let matcher = catalog.matcher();
    let mut found = Vec::new();
    let mut ambiguous = Vec::new();
    let mut missing = Vec::new();

    for reference in parse_references(normalized) {
        if is_nameless(&reference.search_name) {
            missing.push(reference.search_name);
            continue;
        }
        match matcher.lookup(&reference.search_name) {
            MatchOutcome::Found(template) => found.push((template, reference.multiplier)),
            MatchOutcome::NotFound => missing.push(reference.search_name),
            MatchOutcome::Ambiguous(candidates) => ambiguous.push(AmbiguousTerm {
                term: reference.search_name,
                candidates,
            }),
        }
    }

    if !ambiguous.is_empty() {
        return Err(Error::AmbiguousReference(ambiguous));
    }
    if !missing.is_empty() {
        return Err(Error::UnresolvedReference(missing));
    }

    let mut resolved = Vec::with_capacity(found.len());
    for (template, multiplier) in found {
        let entry = catalog.resolve(template).ok_or_else(|| {
            Error::CatalogValidation(format!("Template '{}' is not in the catalog", template.name))
        })?;
        tracing::debug!("Matched {} at x{}", entry.name, multiplier);
        resolved.push((entry, multiplier));
    }
    Ok(resolved)
}
