//! Alert engine: rule-driven classification of validation results.
//!
//! Rules are pure functions of a validation report and corpus statistics. Each
//! rule has a stable id so it can be enabled, disabled, updated or removed at
//! runtime. Rules run in registration order and their alerts are sorted by
//! severity, most recent first within a severity.

use crate::consistency::{CorpusStats, ValidationReport};
use crate::content::ContentType;
use crate::error::ContentError;
use crate::i18n::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Items missing at least this many languages are critical gaps.
pub const CRITICAL_GAP_LANGUAGES: usize = 2;

/// More critical gaps than this add a summary alert.
pub const CRITICAL_SUMMARY_THRESHOLD: usize = 10;

/// Corpora with more documents than this get a pagination advisory.
pub const LARGE_CORPUS_THRESHOLD: usize = 200;

pub const RULE_CRITICAL_SUMMARY: &str = "critical-gap-summary";
pub const RULE_TRANSLATION_GAPS: &str = "translation-gaps";
pub const RULE_STRUCTURAL: &str = "structural-inconsistencies";
pub const RULE_CORPUS_SIZE: &str = "corpus-size-advisory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Sort rank; lower is more severe.
    fn rank(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// A classified finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

/// Inputs handed to every rule in one run.
#[derive(Debug, Clone, Copy)]
pub struct AlertContext<'a> {
    pub report: &'a ValidationReport,
    pub stats: &'a CorpusStats,
    /// Timestamp stamped on every alert of the run
    pub now: DateTime<Utc>,
}

impl AlertContext<'_> {
    fn alert(&self, rule_id: &str, id: String, severity: Severity, title: &str, message: String) -> Alert {
        Alert {
            id,
            rule_id: rule_id.to_string(),
            severity,
            title: title.to_string(),
            message,
            timestamp: self.now,
            content_type: None,
            slug: None,
            language: None,
        }
    }
}

/// Rule body: receives the run context and the rule's configured severity.
pub type AlertPredicate = Arc<dyn Fn(&AlertContext<'_>, Severity) -> Vec<Alert> + Send + Sync>;

/// A named, toggleable alert rule.
#[derive(Clone)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub enabled: bool,
    /// Severity is decided per alert, not by the rule
    mixed_severity: bool,
    predicate: AlertPredicate,
}

impl AlertRule {
    pub fn new<F>(id: impl Into<String>, name: impl Into<String>, severity: Severity, predicate: F) -> Self
    where
        F: Fn(&AlertContext<'_>, Severity) -> Vec<Alert> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            severity,
            enabled: true,
            mixed_severity: false,
            predicate: Arc::new(predicate),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the rule as emitting several severities; its severity cannot be updated.
    pub fn with_mixed_severity(mut self) -> Self {
        self.mixed_severity = true;
        self
    }

    pub fn evaluate(&self, ctx: &AlertContext<'_>) -> Vec<Alert> {
        (self.predicate)(ctx, self.severity)
    }

    pub fn info(&self) -> AlertRuleInfo {
        AlertRuleInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            severity: self.severity,
            enabled: self.enabled,
        }
    }
}

impl fmt::Debug for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("enabled", &self.enabled)
            .field("mixed_severity", &self.mixed_severity)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub enabled: bool,
}

/// Partial update of a rule's metadata; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub severity: Option<Severity>,
    pub enabled: Option<bool>,
}

/// Declarative rules that can be added without code changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleTemplate {
    /// One alert per item missing `language`
    MissingLanguage { language: Language },
    /// One alert when translation completeness drops below `percent`
    CompletenessBelow { percent: u32 },
}

impl RuleTemplate {
    pub fn into_rule(self, id: impl Into<String>, severity: Severity) -> AlertRule {
        let id = id.into();
        let rule_id = id.clone();
        match self {
            RuleTemplate::MissingLanguage { language } => AlertRule::new(
                id,
                format!("Missing {} translations", language.name()),
                severity,
                move |ctx, severity| {
                    ctx.report
                        .results
                        .iter()
                        .filter(|r| r.missing_languages.contains(&language))
                        .map(|r| Alert {
                            content_type: Some(r.content_type),
                            slug: Some(r.canonical_slug.clone()),
                            language: Some(language),
                            ..ctx.alert(
                                &rule_id,
                                format!("{}:{}:{}:{}", rule_id, r.content_type, r.canonical_slug, language),
                                severity,
                                &format!("Missing {} Translation", language.name()),
                                format!(
                                    "{}/{} has no {} translation",
                                    r.content_type, r.canonical_slug, language
                                ),
                            )
                        })
                        .collect()
                },
            ),
            RuleTemplate::CompletenessBelow { percent } => AlertRule::new(
                id,
                format!("Translation completeness below {}%", percent),
                severity,
                move |ctx, severity| {
                    if ctx.stats.translation_completeness >= percent {
                        return Vec::new();
                    }
                    vec![ctx.alert(
                        &rule_id,
                        rule_id.clone(),
                        severity,
                        "Translation Completeness Below Target",
                        format!(
                            "Translation completeness is {}% ({} of {} translations), target is {}%",
                            ctx.stats.translation_completeness,
                            ctx.stats.actual_translations,
                            ctx.stats.total_possible_translations,
                            percent
                        ),
                    )]
                },
            ),
        }
    }
}

fn critical_gap_count(report: &ValidationReport) -> usize {
    report
        .results
        .iter()
        .filter(|r| r.missing_languages.len() >= CRITICAL_GAP_LANGUAGES)
        .count()
}

fn join_languages<'a>(languages: impl IntoIterator<Item = &'a Language>) -> String {
    languages
        .into_iter()
        .map(Language::code)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The built-in rule set, in evaluation order.
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            RULE_CRITICAL_SUMMARY,
            "Widespread translation gaps",
            Severity::Error,
            |ctx, severity| {
                let critical = critical_gap_count(ctx.report);
                if critical <= CRITICAL_SUMMARY_THRESHOLD {
                    return Vec::new();
                }
                vec![ctx.alert(
                    RULE_CRITICAL_SUMMARY,
                    RULE_CRITICAL_SUMMARY.to_string(),
                    severity,
                    "Widespread Translation Gaps",
                    format!(
                        "{} items are missing {} or more translations",
                        critical, CRITICAL_GAP_LANGUAGES
                    ),
                )]
            },
        )
        .with_description("Summary error when more than 10 items have critical translation gaps"),
        AlertRule::new(
            RULE_TRANSLATION_GAPS,
            "Translation gaps",
            Severity::Error,
            |ctx, _| {
                ctx.report
                    .results
                    .iter()
                    .filter(|r| !r.missing_languages.is_empty())
                    .map(|r| {
                        let id = format!("{}:{}:{}", RULE_TRANSLATION_GAPS, r.content_type, r.canonical_slug);
                        let base = if r.missing_languages.len() >= CRITICAL_GAP_LANGUAGES {
                            ctx.alert(
                                RULE_TRANSLATION_GAPS,
                                id,
                                Severity::Error,
                                "Critical Translation Gap",
                                format!(
                                    "{}/{} is missing {} translations: {}",
                                    r.content_type,
                                    r.canonical_slug,
                                    r.missing_languages.len(),
                                    join_languages(&r.missing_languages)
                                ),
                            )
                        } else {
                            ctx.alert(
                                RULE_TRANSLATION_GAPS,
                                id,
                                Severity::Warning,
                                "Missing Translation",
                                format!(
                                    "{}/{} has no {} translation",
                                    r.content_type,
                                    r.canonical_slug,
                                    join_languages(&r.missing_languages)
                                ),
                            )
                        };
                        Alert {
                            content_type: Some(r.content_type),
                            slug: Some(r.canonical_slug.clone()),
                            language: match r.missing_languages.len() {
                                1 => r.missing_languages.iter().next().copied(),
                                _ => None,
                            },
                            ..base
                        }
                    })
                    .collect()
            },
        )
        .with_description("Error per item missing two or more languages, warning per item missing one")
        .with_mixed_severity(),
        AlertRule::new(
            RULE_STRUCTURAL,
            "Structural inconsistencies",
            Severity::Warning,
            |ctx, severity| {
                ctx.report
                    .results
                    .iter()
                    .filter(|r| !r.structural_inconsistencies.is_empty())
                    .map(|r| Alert {
                        content_type: Some(r.content_type),
                        slug: Some(r.canonical_slug.clone()),
                        ..ctx.alert(
                            RULE_STRUCTURAL,
                            format!("{}:{}:{}", RULE_STRUCTURAL, r.content_type, r.canonical_slug),
                            severity,
                            "Structural Inconsistency",
                            format!(
                                "{}/{}: {}",
                                r.content_type,
                                r.canonical_slug,
                                r.structural_inconsistencies.join("; ")
                            ),
                        )
                    })
                    .collect()
            },
        )
        .with_description("Warning per item whose translations diverge from the original"),
        AlertRule::new(
            RULE_CORPUS_SIZE,
            "Large corpus advisory",
            Severity::Info,
            |ctx, severity| {
                if ctx.stats.total_documents <= LARGE_CORPUS_THRESHOLD {
                    return Vec::new();
                }
                vec![ctx.alert(
                    RULE_CORPUS_SIZE,
                    RULE_CORPUS_SIZE.to_string(),
                    severity,
                    "Large Corpus",
                    format!(
                        "Corpus contains {} documents; consider paginating content listings",
                        ctx.stats.total_documents
                    ),
                )]
            },
        )
        .with_description("Advisory when the corpus exceeds 200 documents"),
    ]
}

/// Ordered, mutable rule set.
#[derive(Debug)]
pub struct AlertEngine {
    rules: RwLock<Vec<AlertRule>>,
}

impl AlertEngine {
    /// Engine without any rules.
    pub fn empty() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Engine with the built-in rules.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(default_rules()),
        }
    }

    pub fn list_rules(&self) -> Vec<AlertRuleInfo> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(AlertRule::info)
            .collect()
    }

    /// Append a rule; ids must be unique.
    pub fn add_alert_rule(&self, rule: AlertRule) -> Result<AlertRuleInfo, ContentError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(ContentError::DuplicateRule(rule.id));
        }
        info!("Added alert rule '{}'", rule.id);
        let info = rule.info();
        rules.push(rule);
        Ok(info)
    }

    /// Update a rule's metadata in place.
    pub fn update_alert_rule(&self, id: &str, update: AlertRuleUpdate) -> Result<AlertRuleInfo, ContentError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ContentError::RuleNotFound(id.to_string()))?;

        if update.severity.is_some() && rule.mixed_severity {
            return Err(ContentError::InvalidRuleUpdate {
                rule_id: id.to_string(),
                reason: "rule emits per-alert severities".to_string(),
            });
        }

        if let Some(name) = update.name {
            rule.name = name;
        }
        if let Some(description) = update.description {
            rule.description = description;
        }
        if let Some(severity) = update.severity {
            rule.severity = severity;
        }
        if let Some(enabled) = update.enabled {
            rule.enabled = enabled;
        }

        info!("Updated alert rule '{}'", id);
        Ok(rule.info())
    }

    pub fn remove_alert_rule(&self, id: &str) -> Result<AlertRuleInfo, ContentError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let index = rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| ContentError::RuleNotFound(id.to_string()))?;

        info!("Removed alert rule '{}'", id);
        Ok(rules.remove(index).info())
    }

    /// Run every enabled rule and sort the combined alerts.
    ///
    /// Order: error, warning, info; within a severity, newest first. The sort
    /// is stable, so alerts with equal timestamps keep rule registration order.
    pub fn run_all_alerts(&self, report: &ValidationReport, stats: &CorpusStats) -> Vec<Alert> {
        let ctx = AlertContext {
            report,
            stats,
            now: Utc::now(),
        };

        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner).clone();
        let mut alerts: Vec<Alert> = rules
            .iter()
            .filter(|rule| rule.enabled)
            .flat_map(|rule| {
                let produced = rule.evaluate(&ctx);
                debug!("Rule '{}' produced {} alerts", rule.id, produced.len());
                produced
            })
            .collect();

        alerts.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });

        alerts
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}
