//! Content store accessor: reads documents from the on-disk corpus.
//!
//! Layout: `<root>/<content_type>/<language>/<slug>.md` (`.mdx` also accepted).
//! The store never writes; it turns one file into one [`ContentDocument`].

use crate::content::{is_valid_slug, ContentDocument, ContentType, DerivedMetadata};
use crate::error::ContentError;
use crate::frontmatter::parse_document;
use crate::i18n::Language;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Document extensions, in lookup preference order.
const EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// Filesystem-backed content store.
#[derive(Debug)]
pub struct FsContentStore {
    root: PathBuf,
    reads: AtomicUsize,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of document files read from disk so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn language_dir(&self, content_type: ContentType, language: Language) -> PathBuf {
        self.root.join(content_type.as_str()).join(language.code())
    }

    async fn locate(
        &self,
        content_type: ContentType,
        language: Language,
        slug: &str,
    ) -> Result<Option<PathBuf>, ContentError> {
        let dir = self.language_dir(content_type, language);
        for ext in EXTENSIONS {
            let path = dir.join(format!("{}.{}", slug, ext));
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => return Ok(Some(path)),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(ContentError::io(path.display(), e)),
            }
        }
        Ok(None)
    }

    /// Load one document.
    ///
    /// # Returns
    /// * `Ok(ContentDocument)` with derived metadata filled in
    /// * `Err(ContentError::NotFound)` if no file exists for the key
    /// * `Err(ContentError::Parse)` if the frontmatter is malformed
    pub async fn load(
        &self,
        content_type: ContentType,
        language: Language,
        slug: &str,
    ) -> Result<ContentDocument, ContentError> {
        let not_found = || ContentError::NotFound {
            content_type,
            language,
            slug: slug.to_string(),
        };

        if !is_valid_slug(slug) {
            return Err(not_found());
        }

        let path = self
            .locate(content_type, language, slug)
            .await?
            .ok_or_else(not_found)?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ContentError::io(path.display(), e))?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let last_modified = tokio::fs::metadata(&path)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let checksum = format!("{:x}", Sha256::digest(&bytes));
        let raw = String::from_utf8(bytes).map_err(|_| ContentError::Parse {
            path: path.display().to_string(),
            reason: "document is not valid UTF-8".to_string(),
        })?;

        let (frontmatter, body) = parse_document(&raw, &path.display().to_string())?;
        let derived = DerivedMetadata::from_body(&body, checksum, last_modified);

        debug!(
            "Loaded {}/{}/{} ({} words)",
            content_type, language, slug, derived.word_count
        );

        Ok(ContentDocument {
            content_type,
            language,
            slug: slug.to_string(),
            frontmatter,
            body,
            derived,
        })
    }

    /// List the slugs available for a content type in one language.
    ///
    /// Order is directory discovery order. A missing language directory is
    /// an empty listing, not an error.
    pub async fn list_slugs(
        &self,
        content_type: ContentType,
        language: Language,
    ) -> Result<Vec<String>, ContentError> {
        let dir = self.language_dir(content_type, language);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ContentError::io(dir.display(), e)),
        };

        let mut seen = HashSet::new();
        let mut slugs = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ContentError::io(dir.display(), e))?
        {
            let path = entry.path();
            let is_document = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if !is_document {
                continue;
            }
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| ContentError::io(path.display(), e))?
                .is_file();
            if !is_file {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_valid_slug(stem) {
                warn!("Skipping document with invalid slug: {}", path.display());
                continue;
            }
            if seen.insert(stem.to_string()) {
                slugs.push(stem.to_string());
            }
        }

        Ok(slugs)
    }
}
