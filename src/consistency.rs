//! Consistency checker: validates every translation against its canonical original.
//!
//! The canonical-language corpus is the source of truth for what must exist.
//! Each canonical item is looked up in every other configured language; a miss
//! marks the language as missing, and a resolved translation is compared
//! structurally with the original. A broken document is recorded against its
//! item and the scan carries on.

use crate::content::{ContentDocument, ContentType};
use crate::error::ContentError;
use crate::i18n::Language;
use crate::loader::ContentLoader;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Consistency of one canonical item across languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub content_type: ContentType,
    pub canonical_slug: String,
    pub is_valid: bool,
    pub missing_languages: BTreeSet<Language>,
    pub structural_inconsistencies: Vec<String>,
}

impl ValidationResult {
    fn new(content_type: ContentType, canonical_slug: &str) -> Self {
        Self {
            content_type,
            canonical_slug: canonical_slug.to_string(),
            is_valid: true,
            missing_languages: BTreeSet::new(),
            structural_inconsistencies: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.is_valid = self.missing_languages.is_empty() && self.structural_inconsistencies.is_empty();
        self
    }
}

/// Aggregate output of a full-corpus scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
    pub total_items: usize,
    pub valid_items: usize,
    pub items_with_missing_translations: usize,
    pub items_with_inconsistencies: usize,
    pub generated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn from_results(mut results: Vec<ValidationResult>) -> Self {
        results.sort_by(|a, b| {
            a.content_type
                .cmp(&b.content_type)
                .then_with(|| a.canonical_slug.cmp(&b.canonical_slug))
        });

        Self {
            total_items: results.len(),
            valid_items: results.iter().filter(|r| r.is_valid).count(),
            items_with_missing_translations: results
                .iter()
                .filter(|r| !r.missing_languages.is_empty())
                .count(),
            items_with_inconsistencies: results
                .iter()
                .filter(|r| !r.structural_inconsistencies.is_empty())
                .count(),
            generated_at: Utc::now(),
            results,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.valid_items == self.total_items
    }

    pub fn invalid_results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_valid)
    }

    /// Sum of missing languages over all items.
    pub fn missing_translation_count(&self) -> usize {
        self.results.iter().map(|r| r.missing_languages.len()).sum()
    }
}

/// Aggregate corpus statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    /// Documents across every content type and enabled language
    pub total_documents: usize,
    pub documents: BTreeMap<ContentType, BTreeMap<Language, usize>>,
    pub canonical_items: usize,
    pub actual_translations: usize,
    pub total_possible_translations: usize,
    /// `round(actual / possible × 100)`; 100 when nothing can be translated
    pub translation_completeness: u32,
}

impl CorpusStats {
    /// Combine per-language document counts with a validation report.
    pub fn new(
        documents: BTreeMap<ContentType, BTreeMap<Language, usize>>,
        report: &ValidationReport,
        translation_targets: usize,
    ) -> Self {
        let total_documents = documents.values().flat_map(|langs| langs.values()).sum();
        let total_possible_translations = report.total_items * translation_targets;
        let actual_translations =
            total_possible_translations.saturating_sub(report.missing_translation_count());

        let translation_completeness = if total_possible_translations == 0 {
            100
        } else {
            ((actual_translations as f64 / total_possible_translations as f64) * 100.0).round() as u32
        };

        Self {
            total_documents,
            documents,
            canonical_items: report.total_items,
            actual_translations,
            total_possible_translations,
            translation_completeness,
        }
    }
}

/// Structural differences between a translation and its original.
///
/// `canonical` is `None` when the original could not be loaded; only the
/// translation's own required fields are checked then.
pub fn structural_issues(canonical: Option<&ContentDocument>, translation: &ContentDocument) -> Vec<String> {
    let lang = translation.language;
    let fm = &translation.frontmatter;
    let mut issues = Vec::new();

    if fm.title.trim().is_empty() {
        issues.push(format!("{}: title is empty", lang));
    }
    if fm.description.trim().is_empty() {
        issues.push(format!("{}: description is empty", lang));
    }

    let Some(original) = canonical.map(|doc| &doc.frontmatter) else {
        return issues;
    };

    if !original.tags.is_empty() && fm.tags.is_empty() {
        issues.push(format!(
            "{}: tags are empty but the original has {} tag(s)",
            lang,
            original.tags.len()
        ));
    }

    if let Some(category) = &original.category {
        if fm.category.as_deref().map_or(true, |c| c.trim().is_empty()) {
            issues.push(format!(
                "{}: category is missing (original: '{}')",
                lang, category
            ));
        }
    }

    if let Some(template) = &original.template {
        match &fm.template {
            Some(t) if t == template => {}
            Some(t) => issues.push(format!(
                "{}: template '{}' differs from original '{}'",
                lang, t, template
            )),
            None => issues.push(format!(
                "{}: template is missing (original: '{}')",
                lang, template
            )),
        }
    }

    issues
}

/// Full-corpus and single-item consistency checks.
#[derive(Clone)]
pub struct ConsistencyChecker {
    loader: Arc<ContentLoader>,
}

impl ConsistencyChecker {
    pub fn new(loader: Arc<ContentLoader>) -> Self {
        Self { loader }
    }

    /// Scan every canonical item of every content type.
    ///
    /// Fails only when the corpus itself cannot be listed; per-document
    /// problems are recorded in the report.
    pub async fn check_all_content(&self) -> Result<ValidationReport, ContentError> {
        let started = Instant::now();
        let targets = self.loader.languages().translation_targets();

        let mut items = Vec::new();
        for content_type in ContentType::ALL {
            for slug in self.loader.list_canonical_slugs(content_type).await? {
                items.push((content_type, slug));
            }
        }

        let checks = items
            .iter()
            .map(|(content_type, slug)| self.check_item(*content_type, slug, &targets));
        let report = ValidationReport::from_results(join_all(checks).await);

        info!(
            "Validated {} items in {:?}: {} valid, {} with missing translations, {} with inconsistencies",
            report.total_items,
            started.elapsed(),
            report.valid_items,
            report.items_with_missing_translations,
            report.items_with_inconsistencies
        );

        Ok(report)
    }

    async fn check_item(&self, content_type: ContentType, slug: &str, targets: &[Language]) -> ValidationResult {
        let mut result = ValidationResult::new(content_type, slug);
        let canonical_language = self.loader.languages().canonical();

        let canonical = match self.loader.load_content(content_type, slug, canonical_language).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                result
                    .structural_inconsistencies
                    .push(format!("{}: original could not be loaded: {}", canonical_language, e));
                None
            }
        };

        let loads = targets
            .iter()
            .map(|language| self.loader.load_content(content_type, slug, *language));

        for (language, loaded) in targets.iter().zip(join_all(loads).await) {
            match loaded {
                Ok(doc) => result
                    .structural_inconsistencies
                    .extend(structural_issues(canonical.as_deref(), &doc)),
                Err(e) if e.is_not_found() => {
                    result.missing_languages.insert(*language);
                }
                Err(e) => result
                    .structural_inconsistencies
                    .push(format!("{}: translation could not be loaded: {}", language, e)),
            }
        }

        debug!(
            "{}/{}: {} missing, {} inconsistencies",
            content_type,
            slug,
            result.missing_languages.len(),
            result.structural_inconsistencies.len()
        );
        result.finish()
    }

    /// Check one item in one language without a full rescan.
    ///
    /// # Returns
    /// Human-readable issues; empty when the translation is in sync.
    /// Fails when the canonical original itself cannot be loaded.
    pub async fn check_single_content(
        &self,
        canonical_slug: &str,
        content_type: ContentType,
        language: Language,
    ) -> Result<Vec<String>, ContentError> {
        self.loader.languages().ensure_enabled(language)?;
        let canonical_language = self.loader.languages().canonical();

        let canonical = self
            .loader
            .load_content(content_type, canonical_slug, canonical_language)
            .await?;

        if language == canonical_language {
            return Ok(structural_issues(None, &canonical));
        }

        match self.loader.load_content(content_type, canonical_slug, language).await {
            Ok(doc) => Ok(structural_issues(Some(&canonical), &doc)),
            Err(e) if e.is_not_found() => Ok(vec![format!("{}: translation is missing", language)]),
            Err(e @ ContentError::Parse { .. }) => {
                Ok(vec![format!("{}: translation could not be loaded: {}", language, e)])
            }
            Err(e) => Err(e),
        }
    }

    /// Corpus statistics for a report produced by this checker.
    pub async fn corpus_stats(&self, report: &ValidationReport) -> Result<CorpusStats, ContentError> {
        let languages = self.loader.languages().enabled();
        let mut documents = BTreeMap::new();

        for content_type in ContentType::ALL {
            let mut per_language = BTreeMap::new();
            for language in &languages {
                let count = self.loader.store().list_slugs(content_type, *language).await?.len();
                per_language.insert(*language, count);
            }
            documents.insert(content_type, per_language);
        }

        Ok(CorpusStats::new(
            documents,
            report,
            self.loader.languages().translation_targets().len(),
        ))
    }
}
