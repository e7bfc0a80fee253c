//! Catalog scanning and catalog-root resolution.

use std::{
    cmp::Ordering,
    fmt,
    path::{Path, PathBuf},
};

use {
    serde::Serialize,
    tracing::{debug, warn},
    walkdir::WalkDir,
};

use crate::{
    SKILL_MD,
    error::{Error, Result},
    parse::{self, Document},
    types::CatalogEntry,
};

/// How deep below the catalog root a `SKILL.md` may sit (the file counts as a level).
pub const CATALOG_DEPTH: usize = 3;

/// How many directories upward root resolution looks, starting at the working directory.
const ROOT_SEARCH_LEVELS: usize = 5;

/// Why a `SKILL.md` found during a scan was left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Unreadable(String),
    MalformedHeader(String),
    MissingName,
    MissingDescription,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
            Self::MalformedHeader(e) => write!(f, "malformed frontmatter: {e}"),
            Self::MissingName => f.write_str("missing name"),
            Self::MissingDescription => f.write_str("missing description"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBundle {
    /// Bundle directory.
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of one scan: accepted entries sorted by name, plus what was skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub skipped: Vec<SkippedBundle>,
}

impl Catalog {
    /// Entries whose name or description contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// First entry with exactly this name.
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Scan `root` for bundles.
///
/// Only an unreadable `root` fails the scan. Every other per-bundle problem
/// ends up in [`Catalog::skipped`] and is logged.
pub async fn scan(root: &Path) -> Result<Catalog> {
    if let Err(source) = tokio::fs::read_dir(root).await {
        return Err(Error::ScanRoot {
            path: root.to_path_buf(),
            source,
        });
    }

    let walk_root = root.to_path_buf();
    let files =
        tokio::task::spawn_blocking(move || find_skill_files(&walk_root, CATALOG_DEPTH)).await??;

    let mut catalog = Catalog::default();
    for skill_md in files {
        let dir = skill_md
            .parent()
            .map_or_else(|| root.to_path_buf(), Path::to_path_buf);

        let outcome = match tokio::fs::read_to_string(&skill_md).await {
            Ok(content) => catalog_entry(parse::parse_document(&content), dir.clone()),
            Err(e) => Err(SkipReason::Unreadable(e.to_string())),
        };

        match outcome {
            Ok(entry) => catalog.entries.push(entry),
            Err(reason) => {
                warn!(path = %dir.display(), %reason, "skipping bundle");
                catalog.skipped.push(SkippedBundle { path: dir, reason });
            },
        }
    }

    catalog.entries.sort_by(|a, b| compare_names(&a.name, &b.name));
    debug!(
        root = %root.display(),
        entries = catalog.entries.len(),
        skipped = catalog.skipped.len(),
        "scanned catalog"
    );
    Ok(catalog)
}

/// Accept a decoded document as a catalog entry, or say why not.
pub fn catalog_entry(
    doc: Document,
    dir: PathBuf,
) -> std::result::Result<CatalogEntry, SkipReason> {
    let header = doc.header;
    if header.name().is_none() {
        return Err(match doc.header_error {
            Some(e) => SkipReason::MalformedHeader(e),
            None => SkipReason::MissingName,
        });
    }
    if header.description().is_none() {
        return Err(SkipReason::MissingDescription);
    }
    Ok(CatalogEntry::with_fallbacks(header, dir, ""))
}

/// All files named exactly `SKILL.md` at most `max_depth` levels below
/// `root`, in file-name order. Unreadable subdirectories are logged and
/// skipped; an unreadable `root` is an error.
pub fn find_skill_files(root: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "skipping unreadable path during scan");
                continue;
            },
        };
        if entry.file_type().is_file() && entry.file_name() == SKILL_MD {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

/// Locale-style name ordering: case-insensitive first, exact as tie-break.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Where the catalog root came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootOrigin {
    /// Explicit override (`SKILLS_DIR` or config) that exists on disk.
    Override,
    /// A `skills/` directory in the working directory or an ancestor.
    SkillsDir,
    /// The working directory or an ancestor is itself a bundle; its parent is used.
    ParentOfBundle,
    WorkingDir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRoot {
    pub path: PathBuf,
    pub origin: RootOrigin,
}

/// Pick the catalog root.
///
/// An override that does not exist is ignored. Otherwise up to five
/// directories are examined, starting at `cwd`: the first one containing a
/// `skills/` directory yields that directory, the first one containing
/// `SKILL.md` yields its parent. Falls back to `cwd`.
pub fn resolve_catalog_root(cwd: &Path, override_dir: Option<&Path>) -> CatalogRoot {
    if let Some(dir) = override_dir {
        if dir.exists() {
            debug!(path = %dir.display(), "using catalog root override");
            return CatalogRoot {
                path: dir.to_path_buf(),
                origin: RootOrigin::Override,
            };
        }
        debug!(path = %dir.display(), "catalog root override does not exist, ignoring");
    }

    for dir in cwd.ancestors().take(ROOT_SEARCH_LEVELS) {
        let skills = dir.join("skills");
        if skills.is_dir() {
            debug!(path = %skills.display(), "found skills directory");
            return CatalogRoot {
                path: skills,
                origin: RootOrigin::SkillsDir,
            };
        }
        if dir.join(SKILL_MD).exists() {
            let parent = dir.parent().unwrap_or(dir).to_path_buf();
            debug!(bundle = %dir.display(), path = %parent.display(), "inside a bundle, using its parent");
            return CatalogRoot {
                path: parent,
                origin: RootOrigin::ParentOfBundle,
            };
        }
    }

    CatalogRoot {
        path: cwd.to_path_buf(),
        origin: RootOrigin::WorkingDir,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(dir: &Path, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(SKILL_MD), content).unwrap();
    }

    fn skill(name: &str, description: &str) -> String {
        format!("---\nname: {name}\ndescription: {description}\n---\n# {name}\n")
    }

    #[tokio::test]
    async fn test_scan_collects_valid_bundles_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_skill(&root.join("zeta"), &skill("zeta", "Last one"));
        write_skill(&root.join("alpha"), &skill("alpha", "First one"));
        write_skill(&root.join("nested/Beta"), &skill("Beta", "Mixed case"));
        write_skill(&root.join("no-desc"), "---\nname: no-desc\n---\nbody\n");
        write_skill(&root.join("no-name"), "---\ndescription: nameless\n---\nbody\n");
        write_skill(&root.join("plain"), "# just markdown\n");

        let catalog = scan(root).await.unwrap();
        let names: Vec<&str> = catalog.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "Beta", "zeta"]);
        assert_eq!(catalog.skipped.len(), 3);
        assert!(
            catalog
                .skipped
                .iter()
                .any(|s| s.reason == SkipReason::MissingDescription)
        );
        assert_eq!(catalog.entries[0].path, root.join("alpha"));
    }

    #[tokio::test]
    async fn test_scan_respects_depth_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_skill(&root.join("a/b"), &skill("two-deep", "Bundle two levels down"));
        write_skill(&root.join("a/b/c"), &skill("three-deep", "Too deep to be found"));

        let catalog = scan(root).await.unwrap();
        assert_eq!(catalog.entries.len(), 1);
        assert_eq!(catalog.entries[0].name, "two-deep");
    }

    #[tokio::test]
    async fn test_scan_reports_malformed_header() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("broken"), "---\nname: [oops\n---\nbody\n");

        let catalog = scan(tmp.path()).await.unwrap();
        assert!(catalog.entries.is_empty());
        assert!(matches!(
            catalog.skipped[0].reason,
            SkipReason::MalformedHeader(_)
        ));
    }

    #[tokio::test]
    async fn test_scan_missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = scan(&tmp.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, Error::ScanRoot { .. }));
    }

    #[tokio::test]
    async fn test_scan_ignores_similar_file_names() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("x");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("MY_SKILL.md"), skill("x", "Not the right file")).unwrap();
        std::fs::write(dir.join("skill.md"), skill("x", "Wrong case")).unwrap();

        assert!(scan(tmp.path()).await.unwrap().entries.is_empty());
    }

    #[test]
    fn test_equal_names_keep_scan_order() {
        let mut names = vec!["b", "a", "A", "a"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, ["A", "a", "a", "b"]);
    }

    #[tokio::test]
    async fn test_search_and_find() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("pdf"), &skill("pdf", "Work with PDF documents"));
        write_skill(&tmp.path().join("xlsx"), &skill("xlsx", "Spreadsheets and CSV"));

        let catalog = scan(tmp.path()).await.unwrap();
        let hits = catalog.search("DOCUMENTS");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "pdf");
        assert_eq!(catalog.search("s").len(), 2);
        assert!(catalog.find("xlsx").is_some());
        assert!(catalog.find("XLSX").is_none());
    }

    #[test]
    fn test_resolve_prefers_existing_override() {
        let tmp = tempfile::tempdir().unwrap();
        let override_dir = tmp.path().join("custom");
        std::fs::create_dir_all(&override_dir).unwrap();
        std::fs::create_dir_all(tmp.path().join("skills")).unwrap();

        let root = resolve_catalog_root(tmp.path(), Some(&override_dir));
        assert_eq!(root.origin, RootOrigin::Override);
        assert_eq!(root.path, override_dir);
    }

    #[test]
    fn test_resolve_ignores_missing_override() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("skills")).unwrap();

        let root = resolve_catalog_root(tmp.path(), Some(&tmp.path().join("nope")));
        assert_eq!(root.origin, RootOrigin::SkillsDir);
        assert_eq!(root.path, tmp.path().join("skills"));
    }

    #[test]
    fn test_resolve_finds_skills_dir_in_ancestor() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("skills")).unwrap();
        let cwd = tmp.path().join("a/b/c");
        std::fs::create_dir_all(&cwd).unwrap();

        let root = resolve_catalog_root(&cwd, None);
        assert_eq!(root.path, tmp.path().join("skills"));
    }

    #[test]
    fn test_resolve_stops_after_five_levels() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("skills")).unwrap();
        let cwd = tmp.path().join("a/b/c/d/e");
        std::fs::create_dir_all(&cwd).unwrap();

        let root = resolve_catalog_root(&cwd, None);
        assert_eq!(root.origin, RootOrigin::WorkingDir);
        assert_eq!(root.path, cwd);
    }

    #[test]
    fn test_resolve_inside_bundle_uses_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("catalog/my-skill");
        write_skill(&bundle, &skill("my-skill", "A bundle"));

        let root = resolve_catalog_root(&bundle, None);
        assert_eq!(root.origin, RootOrigin::ParentOfBundle);
        assert_eq!(root.path, tmp.path().join("catalog"));
    }
}
