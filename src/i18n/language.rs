//! Language type: the closed set of languages content can be published in.
//!
//! `Language` is a plain enum so it can key maps and directories directly.
//! Whether a language is *enabled* for a deployment is decided by the
//! [`LanguageRegistry`](crate::i18n::LanguageRegistry), not by the type.

use crate::error::ContentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A content language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Cs,
    De,
    Fr,
}

impl Language {
    /// Every language the engine knows about, canonical first.
    pub const ALL: [Language; 4] = [Language::En, Language::Cs, Language::De, Language::Fr];

    /// Create a Language from an ISO 639-1 code.
    ///
    /// # Returns
    /// * `Ok(Language)` for a known code (case-insensitive)
    /// * `Err(ContentError::LanguageUnsupported)` otherwise
    pub fn from_code(code: &str) -> Result<Language, ContentError> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "cs" => Ok(Language::Cs),
            "de" => Ok(Language::De),
            "fr" => Ok(Language::Fr),
            _ => Err(ContentError::LanguageUnsupported(code.to_string())),
        }
    }

    /// The canonical (source) language every translation derives from.
    pub const fn canonical() -> Language {
        Language::En
    }

    /// ISO 639-1 code, also used as the corpus directory name.
    pub const fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Cs => "cs",
            Language::De => "de",
            Language::Fr => "fr",
        }
    }

    /// English name of the language.
    pub const fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Cs => "Czech",
            Language::De => "German",
            Language::Fr => "French",
        }
    }

    /// Name of the language in the language itself.
    pub const fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Cs => "Čeština",
            Language::De => "Deutsch",
            Language::Fr => "Français",
        }
    }

    pub fn is_canonical(&self) -> bool {
        *self == Language::canonical()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s)
    }
}
