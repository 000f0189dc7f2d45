//! Multilingual content resolution and translation consistency engine.
//!
//! Documents live on disk per content type and language. The engine resolves
//! canonical and native slugs, loads documents through a single-flight cache,
//! and validates that every translation stays in sync with its original.

pub mod alerts;
pub mod api;
pub mod cache;
pub mod config;
pub mod consistency;
pub mod content;
pub mod engine;
pub mod error;
pub mod frontmatter;
pub mod i18n;
pub mod loader;
pub mod scheduler;
pub mod security;
pub mod store;

pub use engine::ContentEngine;
pub use error::ContentError;
