//! Frontmatter parsing.
//!
//! Documents start with a `---` fenced YAML block:
//!
//! ```text
//! ---
//! title: "Cloud migration"
//! description: How we move workloads
//! category: infrastructure
//! tags: [cloud, aws]
//! publishDate: 2024-03-01
//! seo:
//!   title: Cloud migration services
//!   keywords:
//!     - migration
//! ---
//! Body text...
//! ```
//!
//! The block is deserialized once into a typed [`Frontmatter`]. Missing or
//! empty `title`/`description` is a parse error; nothing is filled in.

use crate::content::{Frontmatter, SeoMeta};
use crate::error::ContentError;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

const FENCE: &str = "---";

/// A list field that may also be written as a single scalar.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSeo {
    title: Option<String>,
    description: Option<String>,
    keywords: Option<OneOrMany>,
}

/// Frontmatter as written, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFrontmatter {
    title: Option<String>,
    description: Option<String>,
    seo: Option<RawSeo>,
    category: Option<String>,
    tags: Option<OneOrMany>,
    #[serde(alias = "templateHint", alias = "template_hint")]
    template: Option<String>,
    #[serde(rename = "publishDate", alias = "publish_date", alias = "date")]
    publish_date: Option<String>,
}

/// Split a raw document into typed frontmatter and body.
///
/// # Arguments
/// * `raw` - Full file contents
/// * `path` - Location used in error messages
pub fn parse_document(raw: &str, path: &str) -> Result<(Frontmatter, String), ContentError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let lines: Vec<&str> = raw.lines().collect();

    if lines.first().map(|l| l.trim_end()) != Some(FENCE) {
        return Err(parse_error(path, "document does not start with a frontmatter block"));
    }

    let close = lines
        .iter()
        .skip(1)
        .position(|l| l.trim_end() == FENCE)
        .map(|i| i + 1)
        .ok_or_else(|| parse_error(path, "frontmatter block is not terminated"))?;

    let block = lines[1..close].join("\n");
    let raw_frontmatter: RawFrontmatter = if block.trim().is_empty() {
        RawFrontmatter::default()
    } else {
        serde_yaml::from_str(&block).map_err(|e| parse_error(path, format!("invalid frontmatter: {}", e)))?
    };
    let frontmatter = build_frontmatter(raw_frontmatter, path)?;

    let body = lines[close + 1..].join("\n");
    let body = body.trim_start_matches('\n').to_string();

    Ok((frontmatter, body))
}

fn parse_error(path: &str, reason: impl Into<String>) -> ContentError {
    ContentError::Parse {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, key: &str, path: &str) -> Result<String, ContentError> {
    non_empty(value)
        .ok_or_else(|| parse_error(path, format!("required frontmatter key '{}' is missing or empty", key)))
}

fn parse_date(value: &str, path: &str) -> Result<NaiveDate, ContentError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| parse_error(path, format!("invalid publish date '{}'", value)))
}

fn build_frontmatter(raw: RawFrontmatter, path: &str) -> Result<Frontmatter, ContentError> {
    let title = required(raw.title, "title", path)?;
    let description = required(raw.description, "description", path)?;

    let seo = raw
        .seo
        .map(|seo| SeoMeta {
            title: non_empty(seo.title),
            description: non_empty(seo.description),
            keywords: seo.keywords.map(OneOrMany::into_vec).unwrap_or_default(),
        })
        .unwrap_or_default();

    let publish_date = non_empty(raw.publish_date)
        .map(|d| parse_date(&d, path))
        .transpose()?;

    Ok(Frontmatter {
        title,
        description,
        seo,
        category: non_empty(raw.category),
        tags: raw.tags.map(OneOrMany::into_vec).unwrap_or_default(),
        template: non_empty(raw.template),
        publish_date,
    })
}
