//! Slug registry: canonical ⇄ native slug mapping per content type and language.
//!
//! The canonical slug (the English one) is the stable cross-language key. Each
//! translation may publish under its own native slug; when no mapping exists the
//! native slug is the canonical one. Within a (content type, language) pair the
//! mapping is injective, and construction refuses any input that would break it.

use crate::content::{is_valid_slug, ContentType};
use crate::error::ContentError;
use crate::i18n::Language;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw mapping as stored in the slug map file:
/// content type → canonical slug → language → native slug.
pub type SlugMappings = BTreeMap<ContentType, BTreeMap<String, BTreeMap<Language, String>>>;

/// Bidirectional slug lookup.
#[derive(Debug, Clone, Default)]
pub struct SlugRegistry {
    forward: HashMap<ContentType, HashMap<String, BTreeMap<Language, String>>>,
    reverse: HashMap<(ContentType, Language), HashMap<String, String>>,
}

impl SlugRegistry {
    /// Build a registry, failing fast on invalid slugs or duplicate native slugs.
    pub fn new(mappings: SlugMappings) -> Result<Self, ContentError> {
        let mut forward: HashMap<ContentType, HashMap<String, BTreeMap<Language, String>>> =
            HashMap::new();
        let mut reverse: HashMap<(ContentType, Language), HashMap<String, String>> =
            HashMap::new();

        for (content_type, entries) in mappings {
            for (canonical, natives) in entries {
                if !is_valid_slug(&canonical) {
                    return Err(ContentError::InvalidSlug(canonical));
                }

                let mut translated = BTreeMap::new();
                for (language, native) in natives {
                    if !is_valid_slug(&native) {
                        return Err(ContentError::InvalidSlug(native));
                    }
                    if language.is_canonical() {
                        if native != canonical {
                            warn!(
                                "{}/{}: canonical language entry '{}' differs from canonical slug",
                                content_type, canonical, native
                            );
                            return Err(ContentError::InvalidSlug(native));
                        }
                        continue;
                    }

                    let by_native = reverse.entry((content_type, language)).or_default();
                    if let Some(existing) = by_native.get(&native) {
                        return Err(ContentError::DuplicateNativeSlug {
                            content_type,
                            language,
                            native_slug: native,
                            first: existing.clone(),
                            second: canonical,
                        });
                    }
                    by_native.insert(native.clone(), canonical.clone());
                    translated.insert(language, native);
                }

                forward
                    .entry(content_type)
                    .or_default()
                    .insert(canonical, translated);
            }
        }

        // A mapped native slug must not shadow another canonical slug that
        // falls back to identity in the same language.
        for ((content_type, language), by_native) in &reverse {
            let Some(canonicals) = forward.get(content_type) else {
                continue;
            };
            for (native, canonical) in by_native {
                if native == canonical {
                    continue;
                }
                if let Some(other) = canonicals.get(native) {
                    if !other.contains_key(language) {
                        return Err(ContentError::DuplicateNativeSlug {
                            content_type: *content_type,
                            language: *language,
                            native_slug: native.clone(),
                            first: native.clone(),
                            second: canonical.clone(),
                        });
                    }
                }
            }
        }

        let registry = Self { forward, reverse };
        debug!("Slug registry built with {} canonical slugs", registry.len());
        Ok(registry)
    }

    /// Parse a registry from the JSON slug map format.
    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        let mappings: SlugMappings =
            serde_json::from_str(json).map_err(|e| ContentError::Parse {
                path: "<slug map>".to_string(),
                reason: e.to_string(),
            })?;
        Self::new(mappings)
    }

    /// Load a registry from a JSON slug map file.
    pub fn from_json_file(path: &Path) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path).map_err(|e| ContentError::io(path.display(), e))?;
        let mappings: SlugMappings =
            serde_json::from_str(&json).map_err(|e| ContentError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let registry = Self::new(mappings)?;
        info!(
            "Loaded {} slug mappings from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Number of registered canonical slugs across all content types.
    pub fn len(&self) -> usize {
        self.forward.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Native slug for `canonical` in `language`, or `canonical` unchanged if unmapped.
    pub fn native_slug(&self, content_type: ContentType, canonical: &str, language: Language) -> String {
        self.forward
            .get(&content_type)
            .and_then(|entries| entries.get(canonical))
            .and_then(|natives| natives.get(&language))
            .cloned()
            .unwrap_or_else(|| canonical.to_string())
    }

    /// Canonical slug behind a native slug.
    ///
    /// # Returns
    /// * `Some(canonical)` from an explicit mapping
    /// * `Some(native)` when `native` is a registered canonical slug that has
    ///   no mapping for `language` (identity fallback), or `language` is canonical
    /// * `None` otherwise
    pub fn canonical_slug(
        &self,
        content_type: ContentType,
        native: &str,
        language: Language,
    ) -> Option<String> {
        if language.is_canonical() {
            return Some(native.to_string());
        }

        if let Some(canonical) = self
            .reverse
            .get(&(content_type, language))
            .and_then(|by_native| by_native.get(native))
        {
            return Some(canonical.clone());
        }

        self.forward
            .get(&content_type)
            .and_then(|entries| entries.get(native))
            .filter(|natives| !natives.contains_key(&language))
            .map(|_| native.to_string())
    }

    /// All native slugs for a language across every content type.
    pub fn all_native_slugs(&self, language: Language) -> BTreeSet<String> {
        self.forward
            .iter()
            .flat_map(|(content_type, entries)| {
                entries
                    .keys()
                    .map(move |canonical| self.native_slug(*content_type, canonical, language))
            })
            .collect()
    }

    /// Whether the canonical slug is registered under any content type.
    pub fn has_slug(&self, canonical: &str) -> bool {
        self.forward.values().any(|entries| entries.contains_key(canonical))
    }

    pub fn has_slug_in(&self, content_type: ContentType, canonical: &str) -> bool {
        self.forward
            .get(&content_type)
            .is_some_and(|entries| entries.contains_key(canonical))
    }

    /// Best-effort guess of the language an opaque native slug belongs to.
    ///
    /// Only explicit mappings count, since identity fallbacks are shared by
    /// every language. Returns `None` when no language or more than one
    /// language claims the slug; callers should prefer an explicit language.
    pub fn detect_language(&self, native: &str) -> Option<Language> {
        let matches: BTreeSet<Language> = self
            .reverse
            .iter()
            .filter(|(_, by_native)| by_native.contains_key(native))
            .map(|((_, language), _)| *language)
            .collect();

        match matches.len() {
            1 => matches.into_iter().next(),
            0 => None,
            _ => {
                debug!(
                    "Native slug '{}' is ambiguous across languages {:?}",
                    native, matches
                );
                None
            }
        }
    }
}
