//! Error taxonomy shared by every layer of the engine.

use crate::content::ContentType;
use crate::i18n::Language;
use thiserror::Error;

/// Errors produced by the content engine.
///
/// The type is `Clone` so that a failure produced inside a single-flight cache
/// load can be handed to every waiter on that key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// No document exists for the key.
    #[error("no {content_type} document '{slug}' in {language}")]
    NotFound {
        content_type: ContentType,
        language: Language,
        slug: String,
    },

    /// The canonical document exists but the requested language has no variant.
    #[error("{content_type} '{canonical_slug}' has no {language} translation")]
    TranslationNotAvailable {
        content_type: ContentType,
        language: Language,
        canonical_slug: String,
    },

    /// Malformed document; surfaced per item and never auto-repaired.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Language code outside the configured set.
    #[error("language '{0}' is not supported")]
    LanguageUnsupported(String),

    #[error("unknown content type '{0}'")]
    UnknownContentType(String),

    #[error("alert rule '{0}' not found")]
    RuleNotFound(String),

    #[error("alert rule '{0}' already exists")]
    DuplicateRule(String),

    #[error("alert rule '{rule_id}' cannot be updated: {reason}")]
    InvalidRuleUpdate { rule_id: String, reason: String },

    /// Two canonical slugs share a native slug within one (content type, language).
    #[error(
        "{content_type}/{language}: native slug '{native_slug}' is claimed by both '{first}' and '{second}'"
    )]
    DuplicateNativeSlug {
        content_type: ContentType,
        language: Language,
        native_slug: String,
        first: String,
        second: String,
    },

    #[error("invalid slug '{0}'")]
    InvalidSlug(String),

    #[error("I/O error at {path}: {reason}")]
    Io { path: String, reason: String },
}

impl ContentError {
    /// True for both a plain miss and a missing translation.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContentError::NotFound { .. } | ContentError::TranslationNotAvailable { .. }
        )
    }

    /// True when the canonical document exists but this language variant does not.
    pub fn is_missing_translation(&self) -> bool {
        matches!(self, ContentError::TranslationNotAvailable { .. })
    }

    pub(crate) fn io(path: impl std::fmt::Display, err: std::io::Error) -> Self {
        ContentError::Io {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}
