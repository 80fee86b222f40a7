//! Formula template catalog.
//!
//! Holds the template list for a session, resolves each template's
//! ingredients on first use and caches the result. The catalog is
//! read-only after construction and can be shared across threads.

use crate::composition::{is_compound, COMPOUND_SEPARATOR};
use crate::matcher::{MatchOutcome, TemplateMatcher, DEFAULT_SUFFIXES};
use crate::resolver::resolve_composition;
use crate::types::{FormulaTemplate, ResolvedTemplate, TemplateId};
use crate::{Error, Result};
use once_cell::sync::{Lazy, OnceCell};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Cached sample catalog - built once and reused
static SAMPLE_CATALOG: Lazy<TemplateCatalog> =
    Lazy::new(|| TemplateCatalog::new(build_sample_templates()));

/// Get a reference to the built-in sample catalog
///
/// Used when no catalog export is configured.
pub fn sample_catalog() -> &'static TemplateCatalog {
    &SAMPLE_CATALOG
}

/// Template catalog with lazily resolved ingredient lists
#[derive(Debug)]
pub struct TemplateCatalog {
    templates: Vec<FormulaTemplate>,
    suffixes: Vec<String>,
    resolved: Vec<OnceCell<ResolvedTemplate>>,
    by_id: HashMap<TemplateId, usize>,
}

impl TemplateCatalog {
    /// Build a catalog using the default suffix list
    pub fn new(templates: Vec<FormulaTemplate>) -> Self {
        Self::with_suffixes(
            templates,
            DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Build a catalog with custom formula-type suffixes
    pub fn with_suffixes(templates: Vec<FormulaTemplate>, suffixes: Vec<String>) -> Self {
        let mut by_id = HashMap::new();
        for (idx, template) in templates.iter().enumerate() {
            by_id.entry(template.id).or_insert(idx);
        }
        let resolved = templates.iter().map(|_| OnceCell::new()).collect();

        Self {
            templates,
            suffixes,
            resolved,
            by_id,
        }
    }

    /// Load templates from a `.json` or `.csv` export
    pub fn load(path: &Path, suffixes: Vec<String>) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let templates = match extension.as_deref() {
            Some("json") => load_json(path)?,
            Some("csv") => load_csv(path)?,
            _ => {
                return Err(Error::CatalogValidation(format!(
                    "Unsupported catalog format: {:?} (expected .json or .csv)",
                    path
                )))
            }
        };

        tracing::info!("Loaded {} formula templates from {:?}", templates.len(), path);
        Ok(Self::with_suffixes(templates, suffixes))
    }

    pub fn templates(&self) -> &[FormulaTemplate] {
        &self.templates
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn matcher(&self) -> TemplateMatcher<'_> {
        TemplateMatcher::new(&self.templates, &self.suffixes)
    }

    /// Resolved ingredients of the template with `id`, computed once
    pub fn resolved(&self, id: TemplateId) -> Option<&ResolvedTemplate> {
        let idx = *self.by_id.get(&id)?;
        Some(self.resolved_at(idx))
    }

    /// Resolved ingredients of `template`, which must belong to this catalog
    pub fn resolve(&self, template: &FormulaTemplate) -> Option<&ResolvedTemplate> {
        match self.templates.iter().position(|t| std::ptr::eq(t, template)) {
            Some(idx) => Some(self.resolved_at(idx)),
            None => self.resolved(template.id),
        }
    }

    fn resolved_at(&self, idx: usize) -> &ResolvedTemplate {
        self.resolved[idx].get_or_init(|| {
            let template = &self.templates[idx];
            let mut visited = HashSet::new();
            visited.insert(template.name.clone());

            let ingredients =
                resolve_composition(&template.composition, &self.matcher(), &visited);
            tracing::debug!(
                "Resolved template {} ({}) to {} herbs",
                template.name,
                template.id,
                ingredients.len()
            );

            ResolvedTemplate {
                id: template.id,
                name: template.name.clone(),
                alias: template.alias.clone(),
                ingredients,
            }
        })
    }

    /// Search by name, alias or composition, optionally within a category
    ///
    /// `Some("")` selects uncategorized templates.
    pub fn search(&self, term: &str, category: Option<&str>) -> Vec<&FormulaTemplate> {
        let needle = term.trim().to_lowercase();

        self.templates
            .iter()
            .filter(|t| match category {
                None => true,
                Some("") => t.category.as_deref().map_or(true, str::is_empty),
                Some(c) => t.category.as_deref() == Some(c),
            })
            .filter(|t| {
                needle.is_empty()
                    || t.name.to_lowercase().contains(&needle)
                    || t.alias
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase().contains(&needle))
                    || t.composition.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Check the catalog for problems
    ///
    /// Returns a list of validation errors, or empty Vec if valid. Problems
    /// here never stop a computation; unresolvable compound parts are simply
    /// skipped when resolving.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut seen_names = HashSet::new();
        let matcher = self.matcher();

        for template in &self.templates {
            if !seen_ids.insert(template.id) {
                errors.push(format!("Duplicate template id {}", template.id));
            }
            if template.name.trim().is_empty() {
                errors.push(format!("Template {} has empty name", template.id));
                continue;
            }
            if !seen_names.insert(template.name.as_str()) {
                errors.push(format!("Duplicate template name '{}'", template.name));
            }
            if template.composition.trim().is_empty() {
                errors.push(format!("Template '{}' has empty composition", template.name));
                continue;
            }

            if is_compound(&template.composition) {
                for part in template
                    .composition
                    .split(COMPOUND_SEPARATOR)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                {
                    match matcher.lookup_inner(part) {
                        MatchOutcome::Found(_) => {}
                        MatchOutcome::NotFound => errors.push(format!(
                            "Template '{}' references unknown formula '{}'",
                            template.name, part
                        )),
                        MatchOutcome::Ambiguous(candidates) => errors.push(format!(
                            "Template '{}' references ambiguous formula '{}' ({})",
                            template.name,
                            part,
                            candidates.join(", ")
                        )),
                    }
                }
            }
        }

        errors
    }
}

// ============================================================================
// File formats
// ============================================================================

/// JSON export row; `short_name` stands in for an empty alias
#[derive(Debug, Deserialize)]
struct TemplateRecord {
    id: Option<TemplateId>,
    name: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    composition: Option<String>,
}

/// CSV row; accepts the bulk-upload sheet headers as well
#[derive(Debug, Deserialize)]
struct CsvTemplateRow {
    #[serde(default)]
    id: Option<TemplateId>,
    #[serde(alias = "처방명")]
    name: String,
    #[serde(default, alias = "별명")]
    alias: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default, alias = "분류")]
    category: Option<String>,
    #[serde(default, alias = "출전")]
    source: Option<String>,
    #[serde(default, alias = "약재구성")]
    composition: Option<String>,
}

impl From<CsvTemplateRow> for TemplateRecord {
    fn from(row: CsvTemplateRow) -> Self {
        TemplateRecord {
            id: row.id,
            name: row.name,
            alias: row.alias,
            short_name: row.short_name,
            category: row.category,
            source: row.source,
            composition: row.composition,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TemplateRecord {
    fn into_template(self, position: usize) -> FormulaTemplate {
        let id = self.id.unwrap_or(position as TemplateId + 1);
        FormulaTemplate {
            id,
            name: self.name.trim().to_string(),
            alias: non_empty(self.alias).or_else(|| non_empty(self.short_name)),
            category: non_empty(self.category),
            source: non_empty(self.source),
            composition: self.composition.unwrap_or_default().trim().to_string(),
        }
    }
}

fn load_json(path: &Path) -> Result<Vec<FormulaTemplate>> {
    let contents = std::fs::read_to_string(path)?;
    let records: Vec<TemplateRecord> = serde_json::from_str(&contents)?;
    Ok(records
        .into_iter()
        .enumerate()
        .map(|(idx, r)| r.into_template(idx))
        .collect())
}

fn load_csv(path: &Path) -> Result<Vec<FormulaTemplate>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut templates = Vec::new();
    for (idx, row) in reader.deserialize::<CsvTemplateRow>().enumerate() {
        let record: TemplateRecord = row?.into();
        templates.push(record.into_template(idx));
    }
    Ok(templates)
}

// ============================================================================
// Sample catalog
// ============================================================================

fn build_sample_templates() -> Vec<FormulaTemplate> {
    vec![
        FormulaTemplate::new(
            1,
            "소시호탕",
            "시호:12/황금:8/인삼:6/반하:8/감초:4/생강:4/대조:4",
        )
        .with_alias("小柴胡湯")
        .with_category("화해제"),
        FormulaTemplate::new(
            2,
            "반하사심탕",
            "반하:8/황금:6/건강:6/인삼:6/감초:6/황련:2/대조:4",
        )
        .with_alias("半夏瀉心湯")
        .with_category("화해제"),
        FormulaTemplate::new(
            3,
            "소청룡탕",
            "마황:6/작약:6/세신:4/건강:4/감초:4/계지:6/오미자:4/반하:8",
        )
        .with_alias("小靑龍湯")
        .with_category("해표제"),
        FormulaTemplate::new(4, "오령산", "택사:10/저령:6/복령:6/백출:6/계지:4")
            .with_alias("五苓散")
            .with_category("거습제"),
        FormulaTemplate::new(
            5,
            "사군자탕",
            "인삼:8/백출:8/복령:8/감초:4",
        )
        .with_alias("四君子湯")
        .with_category("보익제"),
        FormulaTemplate::new(
            6,
            "사물탕",
            "숙지황:10/당귀:10/천궁:8/작약:8",
        )
        .with_alias("四物湯")
        .with_category("보익제"),
        FormulaTemplate::new(7, "팔물탕", "사군자+사물")
            .with_alias("八物湯")
            .with_category("보익제"),
        FormulaTemplate::new(8, "시령탕", "소시호탕+오령산")
            .with_alias("柴苓湯")
            .with_category("화해제"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dosage(resolved: &ResolvedTemplate, name: &str) -> Option<f64> {
        resolved
            .ingredients
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.dosage)
    }

    #[test]
    fn test_sample_catalog_loads() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.suffixes(), &["탕", "산", "환", "음"]);
    }

    #[test]
    fn test_sample_catalog_validates() {
        let errors = sample_catalog().validate();
        assert!(
            errors.is_empty(),
            "Sample catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_compound_template_resolves() {
        let catalog = sample_catalog();
        let palmul = catalog.resolved(7).unwrap();

        assert_eq!(palmul.name, "팔물탕");
        assert_eq!(palmul.ingredients.len(), 8);
        assert_eq!(dosage(palmul, "인삼"), Some(8.0));
        assert_eq!(dosage(palmul, "당귀"), Some(10.0));
    }

    #[test]
    fn test_compound_template_takes_max_across_parts() {
        let catalog = sample_catalog();
        let siryeong = catalog.resolved(8).unwrap();

        // 계지 only in 오령산, 시호 only in 소시호탕
        assert_eq!(dosage(siryeong, "계지"), Some(4.0));
        assert_eq!(dosage(siryeong, "시호"), Some(12.0));
        let names: HashSet<_> = siryeong.ingredients.iter().map(|i| &i.name).collect();
        assert_eq!(names.len(), siryeong.ingredients.len());
    }

    #[test]
    fn test_resolution_is_cached() {
        let catalog = sample_catalog();
        let first = catalog.resolved(1).unwrap() as *const ResolvedTemplate;
        let second = catalog.resolved(1).unwrap() as *const ResolvedTemplate;
        assert_eq!(first, second);
        assert!(catalog.resolved(999).is_none());
    }

    #[test]
    fn test_self_referencing_template_terminates() {
        let catalog = TemplateCatalog::new(vec![
            FormulaTemplate::new(1, "갑탕", "을+감초탕"),
            FormulaTemplate::new(2, "을탕", "갑+감초탕"),
            FormulaTemplate::new(3, "감초탕", "감초:8"),
        ]);

        let gap = catalog.resolved(1).unwrap();
        assert_eq!(gap.ingredients.len(), 1);
        assert_eq!(dosage(gap, "감초"), Some(8.0));
    }

    #[test]
    fn test_validate_reports_problems() {
        let catalog = TemplateCatalog::new(vec![
            FormulaTemplate::new(1, "소시호탕", "시호:12"),
            FormulaTemplate::new(1, "소시호탕", "시호:10"),
            FormulaTemplate::new(2, "", "감초:4"),
            FormulaTemplate::new(3, "빈탕", " "),
            FormulaTemplate::new(4, "합방탕", "소시호+없는"),
        ]);

        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate template id 1")));
        assert!(errors.iter().any(|e| e.contains("Duplicate template name")));
        assert!(errors.iter().any(|e| e.contains("empty name")));
        assert!(errors.iter().any(|e| e.contains("'빈탕' has empty composition")));
        assert!(errors.iter().any(|e| e.contains("unknown formula '없는'")));
        // Duplicate names make the 소시호 reference ambiguous
        assert!(errors.iter().any(|e| e.contains("ambiguous formula '소시호'")));
    }

    #[test]
    fn test_search() {
        let catalog = sample_catalog();

        let names: Vec<_> = catalog
            .search("사물", None)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        // 팔물탕 hits through its composition
        assert_eq!(names, vec!["사물탕", "팔물탕"]);

        // Alias and composition hits
        assert_eq!(catalog.search("柴苓", None).len(), 1);
        assert_eq!(catalog.search("세신", None)[0].name, "소청룡탕");

        let boik = catalog.search("", Some("보익제"));
        assert_eq!(boik.len(), 3);
        assert!(catalog.search("", Some("")).is_empty());
    }

    #[test]
    fn test_load_json_with_short_name_fallback() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[
                {{"id": 10, "name": "소시호탕", "alias": "", "short_name": "소시호", "composition": "시호:12/황금:8"}},
                {{"name": "반하사심탕", "composition": "반하:8"}}
            ]"#
        )
        .unwrap();

        let catalog = TemplateCatalog::load(file.path(), vec!["탕".into()]).unwrap();
        assert_eq!(catalog.len(), 2);
        let templates = catalog.templates();
        assert_eq!(templates[0].id, 10);
        assert_eq!(templates[0].alias.as_deref(), Some("소시호"));
        // Missing id falls back to the row position
        assert_eq!(templates[1].id, 2);
        assert_eq!(catalog.resolved(2).unwrap().name, "반하사심탕");
        assert_eq!(catalog.suffixes(), &["탕"]);
    }

    #[test]
    fn test_load_csv_bulk_upload_headers() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "처방명,별명,분류,출전,약재구성").unwrap();
        writeln!(file, "소청룡탕,小靑龍湯,해표제,상한론,마황:6/계지:6").unwrap();
        writeln!(file, "오령산,,,,택사:10/저령:6").unwrap();

        let catalog = TemplateCatalog::load(file.path(), vec!["탕".into(), "산".into()]).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = &catalog.templates()[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.alias.as_deref(), Some("小靑龍湯"));
        assert_eq!(first.source.as_deref(), Some("상한론"));

        let second = &catalog.templates()[1];
        assert_eq!(second.alias, None);
        assert_eq!(second.category, None);
        assert_eq!(catalog.resolved(2).unwrap().ingredients.len(), 2);
    }

    #[test]
    fn test_load_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let result = TemplateCatalog::load(file.path(), vec![]);
        assert!(matches!(result, Err(Error::CatalogValidation(_))));
    }
}
