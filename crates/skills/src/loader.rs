//! Full bundle loading: header with fallbacks, body, and resource lists.

use std::path::{Path, PathBuf};

use {tracing::debug, walkdir::WalkDir};

use crate::{
    SKILL_MD,
    parse,
    types::{CatalogEntry, FullBundle},
};

/// Resource walk depth below the bundle root (the file counts as a level).
const RESOURCE_DEPTH: usize = 2;

/// Load the bundle at `dir`. Returns `None` when its `SKILL.md` is missing or
/// unreadable.
///
/// Unlike the catalog scan this accepts incomplete headers: `name` falls back
/// to the directory name and `description` to an empty string.
pub async fn load_bundle(dir: &Path) -> Option<FullBundle> {
    let content = match tokio::fs::read_to_string(dir.join(SKILL_MD)).await {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "no readable SKILL.md");
            return None;
        },
    };
    let doc = parse::parse_document(&content);

    let walk_root = dir.to_path_buf();
    let files = tokio::task::spawn_blocking(move || resource_files(&walk_root))
        .await
        .ok()?;

    let mut bundle = FullBundle {
        entry: CatalogEntry::with_fallbacks(doc.header, dir.to_path_buf(), &dir_name(dir)),
        body: doc.body,
        scripts: Vec::new(),
        references: Vec::new(),
        assets: Vec::new(),
    };
    for rel in files {
        let bucket = match rel.split('/').next() {
            Some("scripts") => &mut bundle.scripts,
            Some("references") => &mut bundle.references,
            Some("assets") => &mut bundle.assets,
            _ => continue,
        };
        bucket.push(rel);
    }
    Some(bundle)
}

/// Files under `dir`, relative and `/`-joined, in file-name order.
fn resource_files(dir: &Path) -> Vec<String> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(RESOURCE_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable resource path");
                None
            },
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(dir).ok()?;
            Some(relative_slash_path(rel))
        })
        .collect()
}

fn relative_slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn dir_name(dir: &Path) -> String {
    let canonical: PathBuf = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
