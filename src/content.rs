//! Content model: content types and the typed, immutable document record.

use crate::error::ContentError;
use crate::i18n::Language;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Named category of document; also the top-level corpus directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Blog,
    Pages,
    Services,
    Solutions,
    Legal,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Blog,
        ContentType::Pages,
        ContentType::Services,
        ContentType::Solutions,
        ContentType::Legal,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ContentType::Blog => "blog",
            ContentType::Pages => "pages",
            ContentType::Services => "services",
            ContentType::Solutions => "solutions",
            ContentType::Legal => "legal",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ContentError::UnknownContentType(s.to_string()))
    }
}

/// SEO overrides declared under `seo:` in the frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
}

impl SeoMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.keywords.is_empty()
    }
}

/// Structured metadata attached to a document, validated at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub seo: SeoMeta,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Template hint consumed by the presentation layer
    pub template: Option<String>,
    pub publish_date: Option<NaiveDate>,
}

/// Metadata computed from the raw document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetadata {
    pub word_count: usize,
    pub read_time_minutes: usize,
    /// SHA-256 of the raw file, hex encoded
    pub checksum: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Reading speed used for `read_time_minutes`.
pub const WORDS_PER_MINUTE: usize = 200;

impl DerivedMetadata {
    /// Derive word count and reading time from a body.
    pub fn from_body(body: &str, checksum: String, last_modified: Option<DateTime<Utc>>) -> Self {
        let word_count = body.split_whitespace().count();
        Self {
            word_count,
            read_time_minutes: word_count.div_ceil(WORDS_PER_MINUTE),
            checksum,
            last_modified,
        }
    }
}

/// One localized document. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    pub content_type: ContentType,
    pub language: Language,
    /// Native slug in `language`
    pub slug: String,
    pub frontmatter: Frontmatter,
    pub body: String,
    pub derived: DerivedMetadata,
}

static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Slugs are lowercase words (any script) and digits joined by single hyphens.
///
/// Anything else, including path separators and dots, is rejected so that a
/// slug can be joined onto a corpus path safely.
pub fn is_valid_slug(slug: &str) -> bool {
    let regex = SLUG_REGEX
        .get_or_init(|| Regex::new(r"^[\p{Ll}\p{Lo}\p{N}]+(?:-[\p{Ll}\p{Lo}\p{N}]+)*$").unwrap());
    regex.is_match(slug)
}
