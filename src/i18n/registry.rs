//! Language registry: the set of languages a deployment serves.
//!
//! Unlike a process-wide singleton, the registry is built once from
//! configuration and handed to the services that need it.

use crate::error::ContentError;
use crate::i18n::Language;
use tracing::debug;

/// Configuration for a supported language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    pub language: Language,

    /// Whether this is the canonical/source language (exactly one is)
    pub is_canonical: bool,

    /// Whether this language is served by the deployment
    pub enabled: bool,
}

/// Registry of configured languages.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

impl LanguageRegistry {
    /// Build a registry enabling the given languages.
    ///
    /// The canonical language is always enabled; requested duplicates are
    /// ignored. Order follows [`Language::ALL`].
    pub fn new(enabled: &[Language]) -> Self {
        let languages = Language::ALL
            .iter()
            .map(|&language| LanguageConfig {
                language,
                is_canonical: language.is_canonical(),
                enabled: language.is_canonical() || enabled.contains(&language),
            })
            .collect::<Vec<_>>();

        debug!(
            "Language registry enabled: {:?}",
            languages
                .iter()
                .filter(|l| l.enabled)
                .map(|l| l.language.code())
                .collect::<Vec<_>>()
        );

        Self { languages }
    }

    /// Build a registry from a comma-separated list of codes (e.g. `"en,cs,fr"`).
    pub fn from_codes(codes: &str) -> Result<Self, ContentError> {
        let enabled = codes
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(Language::from_code)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(&enabled))
    }

    pub fn canonical(&self) -> Language {
        Language::canonical()
    }

    /// Get the configuration entry for a language.
    pub fn get(&self, language: Language) -> Option<&LanguageConfig> {
        self.languages.iter().find(|l| l.language == language)
    }

    /// All enabled languages, canonical first.
    pub fn enabled(&self) -> Vec<Language> {
        self.languages
            .iter()
            .filter(|l| l.enabled)
            .map(|l| l.language)
            .collect()
    }

    /// Enabled languages other than the canonical one.
    pub fn translation_targets(&self) -> Vec<Language> {
        self.languages
            .iter()
            .filter(|l| l.enabled && !l.is_canonical)
            .map(|l| l.language)
            .collect()
    }

    pub fn is_enabled(&self, language: Language) -> bool {
        self.get(language).map(|l| l.enabled).unwrap_or(false)
    }

    /// Reject a language outside the configured set.
    pub fn ensure_enabled(&self, language: Language) -> Result<Language, ContentError> {
        if self.is_enabled(language) {
            Ok(language)
        } else {
            Err(ContentError::LanguageUnsupported(language.code().to_string()))
        }
    }

    /// Parse a language code and check that it is enabled.
    pub fn parse(&self, code: &str) -> Result<Language, ContentError> {
        self.ensure_enabled(Language::from_code(code)?)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new(&Language::ALL)
    }
}
