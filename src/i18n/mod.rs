//! Internationalization: languages and per-language content addressing.
//!
//! # Architecture
//!
//! - `language`: the closed `Language` enum (`en` is canonical)
//! - `registry`: which languages a deployment serves
//! - `slugs`: canonical ⇄ native slug mapping per content type and language
//!
//! # Example
//!
//! ```rust,ignore
//! use content_engine::i18n::{Language, LanguageRegistry, SlugRegistry};
//!
//! let languages = LanguageRegistry::from_codes("en,cs,fr")?;
//! let slugs = SlugRegistry::from_json_file(Path::new("slugs.json"))?;
//! let native = slugs.native_slug(ContentType::Services, "web-development", Language::Cs);
//! ```

mod language;
mod registry;
mod slugs;

pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
pub use slugs::{SlugMappings, SlugRegistry};
