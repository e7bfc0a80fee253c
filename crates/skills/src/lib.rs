//! Skill bundles: header parsing, catalog scanning, loading, validation,
//! installation, and in-place header edits.
//!
//! A bundle is a directory containing a `SKILL.md` file with YAML frontmatter
//! and a markdown body, plus optional `scripts/`, `references/` and `assets/`
//! subdirectories.

pub mod archive;
pub mod discover;
pub mod error;
pub mod github;
pub mod install;
pub mod loader;
pub mod mutate;
pub mod parse;
pub mod scaffold;
pub mod types;
pub mod validate;

pub use error::{Error, Result};

/// File name of the metadata document at the root of every bundle.
pub const SKILL_MD: &str = "SKILL.md";
