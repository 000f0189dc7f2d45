//! Content loader: the primary read API.
//!
//! Combines the slug registry, the store and the cache, and owns the fallback
//! policy: a document is looked up by its native slug, then by the input taken
//! as already native, and otherwise reported missing. A non-canonical request
//! never silently returns the canonical-language document.

use crate::cache::ContentCache;
use crate::content::{ContentDocument, ContentType, Frontmatter};
use crate::error::ContentError;
use crate::i18n::{Language, LanguageRegistry, SlugRegistry};
use crate::store::FsContentStore;
use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Related-content score for sharing the source's category.
pub const CATEGORY_WEIGHT: usize = 2;

/// Related-content score per shared tag.
pub const TAG_WEIGHT: usize = 1;

fn document_key(content_type: ContentType, language: Language, slug: &str) -> String {
    format!("doc:{}:{}:{}", content_type, language, slug)
}

fn document_prefix(content_type: ContentType, language: Language) -> String {
    format!("doc:{}:{}:", content_type, language)
}

fn collection_key(content_type: ContentType, language: Language) -> String {
    format!("all:{}:{}", content_type, language)
}

/// Cached, policy-enforcing content reader.
pub struct ContentLoader {
    languages: Arc<LanguageRegistry>,
    slugs: Arc<SlugRegistry>,
    store: Arc<FsContentStore>,
    documents: ContentCache<Arc<ContentDocument>>,
    collections: ContentCache<Arc<Vec<Arc<ContentDocument>>>>,
}

impl ContentLoader {
    pub fn new(
        languages: Arc<LanguageRegistry>,
        slugs: Arc<SlugRegistry>,
        store: Arc<FsContentStore>,
        cache_capacity: u64,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            languages,
            slugs,
            store,
            documents: ContentCache::new(cache_capacity, cache_ttl),
            collections: ContentCache::new(cache_capacity, cache_ttl),
        }
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn slugs(&self) -> &SlugRegistry {
        &self.slugs
    }

    pub fn store(&self) -> &FsContentStore {
        &self.store
    }

    /// Cache of individual documents.
    pub fn document_cache(&self) -> &ContentCache<Arc<ContentDocument>> {
        &self.documents
    }

    /// Cache of per-(content type, language) listings.
    pub fn collection_cache(&self) -> &ContentCache<Arc<Vec<Arc<ContentDocument>>>> {
        &self.collections
    }

    async fn load_document(
        &self,
        content_type: ContentType,
        language: Language,
        slug: &str,
    ) -> Result<Arc<ContentDocument>, ContentError> {
        let key = document_key(content_type, language, slug);
        self.documents
            .get_or_set(&key, || async {
                self.store
                    .load(content_type, language, slug)
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// Load a document by canonical or native slug.
    ///
    /// # Resolution order
    /// 1. Translate `slug` as canonical to the native slug for `language`
    /// 2. On a miss, treat `slug` as already native
    /// 3. Otherwise fail; `TranslationNotAvailable` when the canonical
    ///    document exists, `NotFound` when it does not
    ///
    /// Parse errors are returned as-is and stop resolution.
    pub async fn load_content(
        &self,
        content_type: ContentType,
        slug: &str,
        language: Language,
    ) -> Result<Arc<ContentDocument>, ContentError> {
        self.languages.ensure_enabled(language)?;

        let native = self.slugs.native_slug(content_type, slug, language);
        match self.load_document(content_type, language, &native).await {
            Ok(doc) => return Ok(doc),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if native != slug {
            match self.load_document(content_type, language, slug).await {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        Err(self.missing(content_type, slug, language).await)
    }

    /// Classify a miss: a missing translation or a missing document.
    async fn missing(&self, content_type: ContentType, slug: &str, language: Language) -> ContentError {
        let canonical_language = self.languages.canonical();
        if language != canonical_language {
            let canonical_slug = self
                .slugs
                .canonical_slug(content_type, slug, language)
                .unwrap_or_else(|| slug.to_string());

            let canonical = self
                .load_document(content_type, canonical_language, &canonical_slug)
                .await;
            if matches!(canonical, Ok(_) | Err(ContentError::Parse { .. })) {
                debug!(
                    "{}/{} exists but has no {} translation",
                    content_type, canonical_slug, language
                );
                return ContentError::TranslationNotAvailable {
                    content_type,
                    language,
                    canonical_slug,
                };
            }
        }

        ContentError::NotFound {
            content_type,
            language,
            slug: slug.to_string(),
        }
    }

    /// Load a document whose language is not known, guessing it from the slug.
    ///
    /// Detection is best-effort: an ambiguous or unmapped slug is looked up in
    /// the canonical language. Prefer [`load_content`](Self::load_content).
    pub async fn load_content_detecting_language(
        &self,
        content_type: ContentType,
        slug: &str,
    ) -> Result<Arc<ContentDocument>, ContentError> {
        let language = self
            .slugs
            .detect_language(slug)
            .filter(|l| self.languages.is_enabled(*l))
            .unwrap_or_else(|| self.languages.canonical());
        self.load_content(content_type, slug, language).await
    }

    /// Load every document of a content type in one language.
    ///
    /// Cached per (content type, language). Documents that fail to parse are
    /// skipped with a warning; the consistency checker reports them.
    pub async fn load_all_content(
        &self,
        content_type: ContentType,
        language: Language,
    ) -> Result<Vec<Arc<ContentDocument>>, ContentError> {
        self.languages.ensure_enabled(language)?;

        let key = collection_key(content_type, language);
        let docs = self
            .collections
            .get_or_set(&key, || async {
                let slugs = self.store.list_slugs(content_type, language).await?;
                let loads = slugs
                    .iter()
                    .map(|slug| self.load_document(content_type, language, slug));

                let mut docs = Vec::with_capacity(slugs.len());
                for (slug, result) in slugs.iter().zip(join_all(loads).await) {
                    match result {
                        Ok(doc) => docs.push(doc),
                        Err(e @ ContentError::Parse { .. }) => {
                            warn!("Skipping {}/{}/{}: {}", content_type, language, slug, e);
                        }
                        // Removed between listing and loading
                        Err(e) if e.is_not_found() => {}
                        Err(e) => return Err(e),
                    }
                }

                debug!(
                    "Loaded {} {} documents in {}",
                    docs.len(),
                    content_type,
                    language
                );
                Ok(Arc::new(docs))
            })
            .await?;

        Ok(docs.as_ref().clone())
    }

    /// Canonical slugs for a content type, in discovery order.
    pub async fn list_canonical_slugs(&self, content_type: ContentType) -> Result<Vec<String>, ContentError> {
        self.store
            .list_slugs(content_type, self.languages.canonical())
            .await
    }

    /// Rank same-language documents related to a source document.
    ///
    /// Score is `2 × [same category] + 1 × |shared tags|`. Ties go to the more
    /// recently published document (undated last), then to slug order. The
    /// source itself is excluded.
    pub async fn get_related_content(
        &self,
        content_type: ContentType,
        canonical_slug: &str,
        category: Option<&str>,
        tags: &[String],
        language: Language,
        limit: usize,
    ) -> Result<Vec<Arc<ContentDocument>>, ContentError> {
        let source_native = self.slugs.native_slug(content_type, canonical_slug, language);
        let docs = self.load_all_content(content_type, language).await?;

        let mut scored: Vec<(usize, Arc<ContentDocument>)> = docs
            .into_iter()
            .filter(|doc| doc.slug != source_native && doc.slug != canonical_slug)
            .map(|doc| (related_score(&doc.frontmatter, category, tags), doc))
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .cmp(score_a)
                .then_with(|| compare_publish_date_desc(a, b))
                .then_with(|| a.slug.cmp(&b.slug))
        });

        Ok(scored.into_iter().take(limit).map(|(_, doc)| doc).collect())
    }

    /// Configured languages in which the document actually resolves.
    pub async fn get_available_languages(
        &self,
        canonical_slug: &str,
        content_type: ContentType,
    ) -> Vec<Language> {
        let languages = self.languages.enabled();
        let loads = languages
            .iter()
            .map(|language| self.load_content(content_type, canonical_slug, *language));

        languages
            .iter()
            .zip(join_all(loads).await)
            .filter(|(_, result)| result.is_ok())
            .map(|(language, _)| *language)
            .collect()
    }

    /// Drop cached documents and listings for one content type and language.
    pub async fn invalidate(&self, content_type: ContentType, language: Language) {
        self.documents
            .invalidate_prefix(&document_prefix(content_type, language))
            .await;
        self.collections
            .invalidate(&collection_key(content_type, language))
            .await;
    }

    pub async fn invalidate_all(&self) {
        self.documents.invalidate_all().await;
        self.collections.invalidate_all().await;
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Related-content score of a candidate against the source's category and tags.
pub fn related_score(candidate: &Frontmatter, category: Option<&str>, tags: &[String]) -> usize {
    let same_category = match (category, candidate.category.as_deref()) {
        (Some(source), Some(other)) => normalize(source) == normalize(other),
        _ => false,
    };

    let source_tags: HashSet<String> = tags.iter().map(|t| normalize(t)).collect();
    let shared_tags = candidate
        .tags
        .iter()
        .map(|t| normalize(t))
        .collect::<HashSet<_>>()
        .intersection(&source_tags)
        .count();

    usize::from(same_category) * CATEGORY_WEIGHT + shared_tags * TAG_WEIGHT
}

fn compare_publish_date_desc(a: &ContentDocument, b: &ContentDocument) -> Ordering {
    match (a.frontmatter.publish_date, b.frontmatter.publish_date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SeoMeta;
    use crate::i18n::SlugMappings;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_doc(root: &Path, rel: &str, title: &str, extra: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            path,
            format!("---\ntitle: {}\ndescription: About {}\n{}---\nBody of {}\n", title, title, extra, title),
        )
        .unwrap();
    }

    fn loader(root: &Path, mappings: SlugMappings) -> ContentLoader {
        ContentLoader::new(
            Arc::new(LanguageRegistry::default()),
            Arc::new(SlugRegistry::new(mappings).unwrap()),
            Arc::new(FsContentStore::new(root)),
            1_000,
            Duration::from_secs(60),
        )
    }

    fn services_mapping() -> SlugMappings {
        let mut natives = BTreeMap::new();
        natives.insert(Language::Cs, "vyvoj-webu".to_string());
        let mut entries = BTreeMap::new();
        entries.insert("web-development".to_string(), natives);
        let mut mappings = SlugMappings::new();
        mappings.insert(ContentType::Services, entries);
        mappings
    }

    // ==================== load_content Tests ====================

    #[tokio::test]
    async fn test_load_content_via_native_slug() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "services/cs/vyvoj-webu.md", "Vývoj webu", "");
        let loader = loader(dir.path(), services_mapping());

        let doc = loader
            .load_content(ContentType::Services, "web-development", Language::Cs)
            .await
            .unwrap();

        assert_eq!(doc.slug, "vyvoj-webu");
        assert_eq!(doc.language, Language::Cs);
    }

    #[tokio::test]
    async fn test_load_content_accepts_native_input() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "services/cs/vyvoj-webu.md", "Vývoj webu", "");
        let loader = loader(dir.path(), services_mapping());

        let doc = loader
            .load_content(ContentType::Services, "vyvoj-webu", Language::Cs)
            .await
            .unwrap();

        assert_eq!(doc.frontmatter.title, "Vývoj webu");
    }

    #[tokio::test]
    async fn test_load_content_falls_back_to_input_as_native() {
        let dir = TempDir::new().unwrap();
        // Mapped native file missing, but a file under the canonical slug exists
        write_doc(dir.path(), "services/cs/web-development.md", "Web", "");
        let loader = loader(dir.path(), services_mapping());

        let doc = loader
            .load_content(ContentType::Services, "web-development", Language::Cs)
            .await
            .unwrap();

        assert_eq!(doc.slug, "web-development");
        assert_eq!(doc.language, Language::Cs);
    }

    #[tokio::test]
    async fn test_load_content_never_substitutes_canonical() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "blog/en/english-only-post.md", "English only", "");
        let loader = loader(dir.path(), SlugMappings::new());

        let err = loader
            .load_content(ContentType::Blog, "english-only-post", Language::Fr)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(
            err,
            ContentError::TranslationNotAvailable {
                content_type: ContentType::Blog,
                language: Language::Fr,
                canonical_slug: "english-only-post".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_load_content_missing_everywhere() {
        let dir = TempDir::new().unwrap();
        let loader = loader(dir.path(), SlugMappings::new());

        let err = loader
            .load_content(ContentType::Blog, "ghost", Language::De)
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_content_rejects_disabled_language() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "blog/en/post.md", "Post", "");
        let loader = ContentLoader::new(
            Arc::new(LanguageRegistry::new(&[Language::Cs])),
            Arc::new(SlugRegistry::default()),
            Arc::new(FsContentStore::new(dir.path())),
            100,
            Duration::from_secs(60),
        );

        let err = loader
            .load_content(ContentType::Blog, "post", Language::Fr)
            .await
            .unwrap_err();

        assert_eq!(err, ContentError::LanguageUnsupported("fr".to_string()));
    }

    #[tokio::test]
    async fn test_load_content_propagates_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blog/en/broken.md");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "---\ntitle: T\n---\n").unwrap();
        let loader = loader(dir.path(), SlugMappings::new());

        let err = loader
            .load_content(ContentType::Blog, "broken", Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_load_content_detecting_language() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "services/cs/vyvoj-webu.md", "Vývoj webu", "");
        write_doc(dir.path(), "services/en/web-development.md", "Web", "");
        let loader = loader(dir.path(), services_mapping());

        let cs = loader
            .load_content_detecting_language(ContentType::Services, "vyvoj-webu")
            .await
            .unwrap();
        assert_eq!(cs.language, Language::Cs);

        let en = loader
            .load_content_detecting_language(ContentType::Services, "web-development")
            .await
            .unwrap();
        assert_eq!(en.language, Language::En);
    }

    // ==================== Caching Tests ====================

    #[tokio::test]
    async fn test_load_all_content_is_cached() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "services/en/a.md", "A", "");
        write_doc(dir.path(), "services/en/b.md", "B", "");
        let loader = loader(dir.path(), SlugMappings::new());

        let first = loader.load_all_content(ContentType::Services, Language::En).await.unwrap();
        let second = loader.load_all_content(ContentType::Services, Language::En).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(loader.collection_cache().metrics().misses(), 1);
        assert_eq!(loader.store().reads(), 2);
    }

    #[tokio::test]
    async fn test_load_all_content_skips_broken_documents() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "blog/en/good.md", "Good", "");
        let broken = dir.path().join("blog/en/broken.md");
        std::fs::write(&broken, "no frontmatter").unwrap();
        let loader = loader(dir.path(), SlugMappings::new());

        let docs = loader.load_all_content(ContentType::Blog, Language::En).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].slug, "good");
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "pages/en/about.md", "About", "");
        let loader = loader(dir.path(), SlugMappings::new());

        loader.load_all_content(ContentType::Pages, Language::En).await.unwrap();
        write_doc(dir.path(), "pages/en/team.md", "Team", "");
        let stale = loader.load_all_content(ContentType::Pages, Language::En).await.unwrap();
        assert_eq!(stale.len(), 1);

        loader.invalidate(ContentType::Pages, Language::En).await;
        let fresh = loader.load_all_content(ContentType::Pages, Language::En).await.unwrap();
        assert_eq!(fresh.len(), 2);
    }

    // ==================== Related Content Tests ====================

    fn frontmatter(category: Option<&str>, tags: &[&str]) -> Frontmatter {
        Frontmatter {
            title: "t".to_string(),
            description: "d".to_string(),
            seo: SeoMeta::default(),
            category: category.map(String::from),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            template: None,
            publish_date: None,
        }
    }

    #[test]
    fn test_related_score() {
        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(related_score(&frontmatter(Some("X"), &["a", "b"]), Some("X"), &tags), 4);
        assert_eq!(related_score(&frontmatter(Some("x"), &[]), Some("X"), &tags), 2);
        assert_eq!(related_score(&frontmatter(Some("Y"), &["A"]), Some("X"), &tags), 1);
        assert_eq!(related_score(&frontmatter(None, &["c"]), None, &tags), 0);
    }

    #[tokio::test]
    async fn test_get_related_content_ranking() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "blog/en/source.md", "Source", "category: X\ntags: [a, b]\n");
        write_doc(dir.path(), "blog/en/post-a.md", "A", "category: X\ntags: [a, b]\n");
        write_doc(dir.path(), "blog/en/post-b.md", "B", "category: X\n");
        write_doc(dir.path(), "blog/en/post-c.md", "C", "category: Y\ntags: [a]\n");
        write_doc(dir.path(), "blog/en/post-d.md", "D", "category: Z\n");
        let loader = loader(dir.path(), SlugMappings::new());
        let tags = vec!["a".to_string(), "b".to_string()];

        let related = loader
            .get_related_content(ContentType::Blog, "source", Some("X"), &tags, Language::En, 3)
            .await
            .unwrap();

        let slugs: Vec<&str> = related.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, vec!["post-a", "post-b", "post-c"]);
    }

    #[tokio::test]
    async fn test_get_related_content_ties_by_publish_date() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "blog/en/old.md", "Old", "category: X\npublishDate: 2023-01-01\n");
        write_doc(dir.path(), "blog/en/new.md", "New", "category: X\npublishDate: 2024-06-01\n");
        write_doc(dir.path(), "blog/en/undated.md", "Undated", "category: X\n");
        let loader = loader(dir.path(), SlugMappings::new());

        let related = loader
            .get_related_content(ContentType::Blog, "source", Some("X"), &[], Language::En, 10)
            .await
            .unwrap();

        let slugs: Vec<&str> = related.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "old", "undated"]);
        assert_eq!(
            related[0].frontmatter.publish_date,
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
    }

    #[tokio::test]
    async fn test_get_related_content_excludes_native_source() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "services/cs/vyvoj-webu.md", "Vývoj", "category: X\n");
        write_doc(dir.path(), "services/cs/hosting.md", "Hosting", "category: X\n");
        let loader = loader(dir.path(), services_mapping());

        let related = loader
            .get_related_content(ContentType::Services, "web-development", Some("X"), &[], Language::Cs, 5)
            .await
            .unwrap();

        assert_eq!(related.len(), 1);
        assert_eq!(related[0].slug, "hosting");
    }

    // ==================== Available Languages Tests ====================

    #[tokio::test]
    async fn test_get_available_languages() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "services/en/web-development.md", "Web", "");
        write_doc(dir.path(), "services/cs/vyvoj-webu.md", "Vývoj webu", "");
        write_doc(dir.path(), "services/fr/web-development.md", "Web FR", "");
        let loader = loader(dir.path(), services_mapping());

        let languages = loader
            .get_available_languages("web-development", ContentType::Services)
            .await;

        assert_eq!(languages, vec![Language::En, Language::Cs, Language::Fr]);
    }
}
