use crate::i18n::Language;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Corpus
    pub content_dir: PathBuf,
    pub slug_map_file: Option<PathBuf>,
    pub languages: Vec<Language>,

    // Cache
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,

    // Server
    pub port: u16,
    pub api_key: Option<String>,

    // Scheduled validation, HH:MM in UTC
    pub validation_schedule: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            slug_map_file: None,
            languages: Language::ALL.to_vec(),
            cache_ttl_secs: 300,
            cache_capacity: 10_000,
            port: 8080,
            api_key: None,
            validation_schedule: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            // Corpus
            content_dir: std::env::var("CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.content_dir),
            slug_map_file: std::env::var("SLUG_MAP_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            languages: match std::env::var("LANGUAGES") {
                Ok(codes) => parse_languages(&codes).context("LANGUAGES is invalid")?,
                Err(_) => defaults.languages,
            },

            // Cache
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_secs),
            cache_capacity: std::env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_capacity),

            // Server
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            api_key: std::env::var("API_KEY").ok().filter(|v| !v.is_empty()),

            validation_schedule: std::env::var("VALIDATION_SCHEDULE")
                .map(|v| parse_schedule(&v))
                .unwrap_or_default(),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Parse a comma-separated language list. The canonical language is always included.
fn parse_languages(codes: &str) -> Result<Vec<Language>> {
    let mut languages = vec![Language::canonical()];
    for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let language =
            Language::from_code(code).with_context(|| format!("unknown language code '{}'", code))?;
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    Ok(languages)
}

fn parse_schedule(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
