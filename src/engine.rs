//! Engine facade: wires registries, store, loader, checker and alert rules.
//!
//! One [`ContentEngine`] is built per process from [`Config`] and shared as an
//! `Arc` with the HTTP layer and the scheduler.

use crate::alerts::{Alert, AlertEngine, AlertRuleInfo, AlertRuleUpdate, RuleTemplate, Severity};
use crate::config::Config;
use crate::consistency::{ConsistencyChecker, CorpusStats, ValidationReport};
use crate::content::ContentType;
use crate::error::ContentError;
use crate::i18n::{Language, LanguageRegistry, SlugRegistry};
use crate::loader::ContentLoader;
use crate::store::FsContentStore;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// One complete validation pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRun {
    pub report: ValidationReport,
    pub stats: CorpusStats,
    pub alerts: Vec<Alert>,
}

impl ValidationRun {
    pub fn count(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

/// Alert rule management request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AlertAction {
    List,
    Run,
    Add {
        #[serde(rename = "ruleId")]
        rule_id: String,
        name: Option<String>,
        description: Option<String>,
        #[serde(default = "default_rule_severity")]
        severity: Severity,
        template: RuleTemplate,
    },
    Update {
        #[serde(rename = "ruleId")]
        rule_id: String,
        name: Option<String>,
        description: Option<String>,
        severity: Option<Severity>,
        enabled: Option<bool>,
    },
    Remove {
        #[serde(rename = "ruleId")]
        rule_id: String,
    },
    Enable {
        #[serde(rename = "ruleId")]
        rule_id: String,
    },
    Disable {
        #[serde(rename = "ruleId")]
        rule_id: String,
    },
}

fn default_rule_severity() -> Severity {
    Severity::Warning
}

impl AlertAction {
    /// Whether the action changes the rule set.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, AlertAction::List | AlertAction::Run)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertActionResponse {
    Rules(Vec<AlertRuleInfo>),
    Alerts(Vec<Alert>),
    Rule(AlertRuleInfo),
}

pub struct ContentEngine {
    loader: Arc<ContentLoader>,
    checker: ConsistencyChecker,
    alerts: AlertEngine,
}

impl ContentEngine {
    /// Engine over an existing loader with the built-in alert rules.
    pub fn new(loader: Arc<ContentLoader>) -> Self {
        Self {
            checker: ConsistencyChecker::new(Arc::clone(&loader)),
            loader,
            alerts: AlertEngine::new(),
        }
    }

    /// Build the engine from configuration.
    ///
    /// Fails if the slug map cannot be read or is inconsistent.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let languages = Arc::new(LanguageRegistry::new(&config.languages));

        let slugs = match &config.slug_map_file {
            Some(path) => SlugRegistry::from_json_file(path)
                .with_context(|| format!("Failed to load slug map from {}", path.display()))?,
            None => SlugRegistry::default(),
        };
        info!(
            "Loaded {} slug mappings; languages: {}",
            slugs.len(),
            languages
                .enabled()
                .iter()
                .map(Language::code)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let store = Arc::new(FsContentStore::new(&config.content_dir));
        let loader = Arc::new(ContentLoader::new(
            languages,
            Arc::new(slugs),
            store,
            config.cache_capacity,
            config.cache_ttl(),
        ));

        Ok(Self::new(loader))
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.loader
    }

    pub fn checker(&self) -> &ConsistencyChecker {
        &self.checker
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub async fn validation_report(&self) -> Result<ValidationReport, ContentError> {
        self.checker.check_all_content().await
    }

    pub async fn corpus_stats(&self) -> Result<CorpusStats, ContentError> {
        let report = self.checker.check_all_content().await?;
        self.checker.corpus_stats(&report).await
    }

    pub async fn check_single(
        &self,
        canonical_slug: &str,
        content_type: ContentType,
        language: Language,
    ) -> Result<Vec<String>, ContentError> {
        self.checker
            .check_single_content(canonical_slug, content_type, language)
            .await
    }

    /// Scan the corpus and evaluate every enabled alert rule.
    pub async fn validate(&self) -> Result<ValidationRun, ContentError> {
        let report = self.checker.check_all_content().await?;
        let stats = self.checker.corpus_stats(&report).await?;
        let alerts = self.alerts.run_all_alerts(&report, &stats);

        Ok(ValidationRun {
            report,
            stats,
            alerts,
        })
    }

    pub async fn run_all_alerts(&self) -> Result<Vec<Alert>, ContentError> {
        Ok(self.validate().await?.alerts)
    }

    pub async fn handle_alert_action(&self, action: AlertAction) -> Result<AlertActionResponse, ContentError> {
        let toggle = |enabled| AlertRuleUpdate {
            enabled: Some(enabled),
            ..Default::default()
        };

        Ok(match action {
            AlertAction::List => AlertActionResponse::Rules(self.alerts.list_rules()),
            AlertAction::Run => AlertActionResponse::Alerts(self.run_all_alerts().await?),
            AlertAction::Add {
                rule_id,
                name,
                description,
                severity,
                template,
            } => {
                let mut rule = template.into_rule(rule_id, severity);
                if let Some(name) = name {
                    rule.name = name;
                }
                if let Some(description) = description {
                    rule.description = description;
                }
                AlertActionResponse::Rule(self.alerts.add_alert_rule(rule)?)
            }
            AlertAction::Update {
                rule_id,
                name,
                description,
                severity,
                enabled,
            } => AlertActionResponse::Rule(self.alerts.update_alert_rule(
                &rule_id,
                AlertRuleUpdate {
                    name,
                    description,
                    severity,
                    enabled,
                },
            )?),
            AlertAction::Remove { rule_id } => {
                AlertActionResponse::Rule(self.alerts.remove_alert_rule(&rule_id)?)
            }
            AlertAction::Enable { rule_id } => {
                AlertActionResponse::Rule(self.alerts.update_alert_rule(&rule_id, toggle(true))?)
            }
            AlertAction::Disable { rule_id } => {
                AlertActionResponse::Rule(self.alerts.update_alert_rule(&rule_id, toggle(false))?)
            }
        })
    }

    /// Drop cached content, narrowed by content type and/or language.
    pub async fn invalidate(&self, content_type: Option<ContentType>, language: Option<Language>) {
        let content_types = match content_type {
            Some(t) => vec![t],
            None => ContentType::ALL.to_vec(),
        };
        let languages = match language {
            Some(l) => vec![l],
            None => self.loader.languages().enabled(),
        };

        if content_type.is_none() && language.is_none() {
            self.loader.invalidate_all().await;
        } else {
            for t in &content_types {
                for l in &languages {
                    self.loader.invalidate(*t, *l).await;
                }
            }
        }

        info!(
            "Invalidated cache for {} / {}",
            content_type.map_or("all types".to_string(), |t| t.to_string()),
            language.map_or("all languages".to_string(), |l| l.to_string())
        );
    }
}
