//! Installing bundles from a local directory or a GitHub repository, and
//! removing installed ones.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use {
    serde::Serialize,
    skillman_config::InstallConfig,
    tracing::{debug, info, warn},
};

use crate::{
    SKILL_MD,
    archive::ArchiveExtractor,
    discover,
    error::{Context, Error, Result},
    github::RepoHost,
    parse,
    types::CatalogEntry,
};

/// Bundle directories may sit up to two levels below the searched directory.
const REMOTE_SEARCH_DEPTH: usize = 3;

const FALLBACK_BRANCH: &str = "main";

// ── Sources ─────────────────────────────────────────────────────────────────

/// `owner/repo` plus an optional path inside the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub subpath: Option<String>,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(sub) = &self.subpath {
            write!(f, "/{sub}")?;
        }
        Ok(())
    }
}

/// Where a bundle is installed from, decided once from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillSource {
    Local(PathBuf),
    Remote(RepoRef),
}

impl SkillSource {
    /// Paths start with `/`, `./` or `../`; anything else is
    /// `owner/repo[/sub/path]`, optionally as a `github.com` URL.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with('/') || input.starts_with("./") || input.starts_with("../") {
            return Ok(Self::Local(PathBuf::from(input)));
        }

        let stripped = input
            .strip_prefix("https://github.com/")
            .or_else(|| input.strip_prefix("http://github.com/"))
            .or_else(|| input.strip_prefix("github.com/"))
            .unwrap_or(input)
            .trim_end_matches('/');

        let mut segments = stripped.split('/');
        let (Some(owner), Some(repo)) = (segments.next(), segments.next()) else {
            return Err(Error::invalid_source(input));
        };
        let repo = repo.trim_end_matches(".git");
        if owner.is_empty() || repo.is_empty() {
            return Err(Error::invalid_source(input));
        }

        let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
        if rest.iter().any(|s| *s == "." || *s == "..") {
            return Err(Error::invalid_source(input));
        }

        Ok(Self::Remote(RepoRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            subpath: (!rest.is_empty()).then(|| rest.join("/")),
        }))
    }
}

// ── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallOutcome {
    Installed { name: String, path: PathBuf },
    /// Target exists and `force` was off; nothing was touched.
    AlreadyExists { name: String, path: PathBuf },
}

impl InstallOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Installed { name, .. } | Self::AlreadyExists { name, .. } => name,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// One bundle of a multi-bundle repository.
#[derive(Debug)]
pub struct BundleAttempt {
    /// Bundle directory inside the extracted snapshot, relative to the searched directory.
    pub source: PathBuf,
    pub result: Result<InstallOutcome>,
}

#[derive(Debug)]
pub enum RemoteInstall {
    RepoNotFound { owner: String, repo: String },
    Single(InstallOutcome),
    Multiple(Vec<BundleAttempt>),
    NoBundleFound { searched: String },
}

impl RemoteInstall {
    pub fn installed_count(&self) -> usize {
        match self {
            Self::Single(outcome) => usize::from(outcome.is_installed()),
            Self::Multiple(attempts) => attempts
                .iter()
                .filter(|a| matches!(&a.result, Ok(o) if o.is_installed()))
                .count(),
            Self::RepoNotFound { .. } | Self::NoBundleFound { .. } => 0,
        }
    }
}

#[derive(Debug)]
pub enum SourceInstall {
    Local(InstallOutcome),
    Remote(RemoteInstall),
}

// ── Installer ───────────────────────────────────────────────────────────────

/// Installs bundles as direct children of `install_dir`, named after their
/// `name` field.
#[derive(Debug, Clone)]
pub struct Installer {
    install_dir: PathBuf,
    force: bool,
}

impl Installer {
    pub fn new(install_dir: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            install_dir: install_dir.into(),
            force,
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub async fn install(
        &self,
        source: &SkillSource,
        host: &dyn RepoHost,
        extractor: &dyn ArchiveExtractor,
    ) -> Result<SourceInstall> {
        match source {
            SkillSource::Local(path) => Ok(SourceInstall::Local(self.install_local(path).await?)),
            SkillSource::Remote(repo_ref) => Ok(SourceInstall::Remote(
                self.install_remote(repo_ref, host, extractor).await?,
            )),
        }
    }

    /// Copy the bundle at `source_dir` into the install directory.
    ///
    /// An existing target is left alone unless `force` is set, in which case
    /// it is removed first.
    pub async fn install_local(&self, source_dir: &Path) -> Result<InstallOutcome> {
        let source_dir = std::path::absolute(source_dir)?;
        let skill_md = source_dir.join(SKILL_MD);
        if !tokio::fs::metadata(&skill_md)
            .await
            .is_ok_and(|m| m.is_file())
        {
            return Err(Error::missing_skill_md(&source_dir));
        }

        let content = tokio::fs::read_to_string(&skill_md).await?;
        let doc = parse::parse_document(&content);
        let name = match doc.header.name() {
            Some(name) => name.to_string(),
            None => source_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("cannot derive a skill name from the source path")?,
        };
        check_install_name(&name)?;

        tokio::fs::create_dir_all(&self.install_dir).await?;
        let target = self.install_dir.join(&name);
        let canonical_source = tokio::fs::canonicalize(&source_dir).await?;
        let canonical_target = tokio::fs::canonicalize(&self.install_dir).await?.join(&name);
        if canonical_target.starts_with(&canonical_source) {
            return Err(Error::TargetInsideSource {
                bundle: canonical_source,
                target: canonical_target,
            });
        }

        if tokio::fs::try_exists(&target).await? {
            if !self.force {
                debug!(%name, path = %target.display(), "install target exists, skipping");
                return Ok(InstallOutcome::AlreadyExists { name, path: target });
            }
            info!(%name, path = %target.display(), "replacing existing install");
            remove_path(&target).await?;
        }

        let (from, to) = (source_dir.clone(), target.clone());
        tokio::task::spawn_blocking(move || copy_tree(&from, &to)).await??;

        info!(%name, source = %source_dir.display(), path = %target.display(), "installed skill");
        Ok(InstallOutcome::Installed { name, path: target })
    }

    /// Download, extract, and install every bundle found in `repo_ref`.
    ///
    /// The temporary download directory is removed before returning, whether
    /// the install succeeded or not.
    pub async fn install_remote(
        &self,
        repo_ref: &RepoRef,
        host: &dyn RepoHost,
        extractor: &dyn ArchiveExtractor,
    ) -> Result<RemoteInstall> {
        let Some(info) = host.repo_info(&repo_ref.owner, &repo_ref.repo).await? else {
            return Ok(RemoteInstall::RepoNotFound {
                owner: repo_ref.owner.clone(),
                repo: repo_ref.repo.clone(),
            });
        };
        let branch = match info.default_branch.filter(|b| !b.is_empty()) {
            Some(branch) => branch,
            None => {
                warn!(repo = %repo_ref, branch = FALLBACK_BRANCH, "repository info has no default branch, assuming fallback");
                FALLBACK_BRANCH.to_string()
            },
        };

        info!(repo = %repo_ref, %branch, "downloading repository snapshot");
        let zip = host
            .download_zip(&repo_ref.owner, &repo_ref.repo, &branch)
            .await?;

        let tmp = tempfile::Builder::new()
            .prefix("skill-install-")
            .tempdir()?;
        let result = self
            .install_snapshot(repo_ref, &branch, &zip, tmp.path(), extractor)
            .await;

        let tmp_path = tmp.path().to_path_buf();
        if let Err(e) = tmp.close() {
            warn!(path = %tmp_path.display(), error = %e, "failed to remove temporary directory");
        }
        result
    }

    async fn install_snapshot(
        &self,
        repo_ref: &RepoRef,
        branch: &str,
        zip: &[u8],
        tmp: &Path,
        extractor: &dyn ArchiveExtractor,
    ) -> Result<RemoteInstall> {
        let archive = tmp.join("repo.zip");
        tokio::fs::write(&archive, zip).await?;
        extractor.extract(&archive, tmp).await?;

        let extracted = tmp.join(format!("{}-{}", repo_ref.repo, branch.replace('/', "-")));
        let source_dir = match &repo_ref.subpath {
            Some(sub) => extracted.join(sub),
            None => extracted,
        };

        if !source_dir.is_dir() {
            warn!(repo = %repo_ref, "path not present in snapshot");
            return Ok(RemoteInstall::NoBundleFound {
                searched: repo_ref.to_string(),
            });
        }

        if source_dir.join(SKILL_MD).is_file() {
            return Ok(RemoteInstall::Single(self.install_local(&source_dir).await?));
        }

        debug!(repo = %repo_ref, "no SKILL.md at the root, searching subdirectories");
        let search_root = source_dir.clone();
        let found = tokio::task::spawn_blocking(move || {
            discover::find_skill_files(&search_root, REMOTE_SEARCH_DEPTH)
        })
        .await??;

        if found.is_empty() {
            return Ok(RemoteInstall::NoBundleFound {
                searched: repo_ref.to_string(),
            });
        }

        let mut attempts = Vec::with_capacity(found.len());
        for skill_md in found {
            let Some(bundle_dir) = skill_md.parent() else {
                continue;
            };
            let result = self.install_local(bundle_dir).await;
            if let Err(e) = &result {
                warn!(bundle = %bundle_dir.display(), error = %e, "failed to install bundle");
            }
            attempts.push(BundleAttempt {
                source: bundle_dir
                    .strip_prefix(&source_dir)
                    .unwrap_or(bundle_dir)
                    .to_path_buf(),
                result,
            });
        }
        Ok(RemoteInstall::Multiple(attempts))
    }
}

/// Installed bundle names become directory names under the install root.
fn check_install_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(Error::invalid_skill_name(name)),
    }
}

async fn remove_path(path: &Path) -> Result<()> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;

    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

// ── Install locations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallScope {
    Global,
    Project,
}

impl InstallScope {
    pub fn other(self) -> Self {
        match self {
            Self::Global => Self::Project,
            Self::Project => Self::Global,
        }
    }

    /// Command-line flag that selects this scope, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Self::Global => Some("--global"),
            Self::Project => None,
        }
    }
}

impl fmt::Display for InstallScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Global => "global",
            Self::Project => "project",
        })
    }
}

/// The two install roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDirs {
    pub global: PathBuf,
    pub project: PathBuf,
}

impl InstallDirs {
    /// Global defaults to `~/.claude/skills`; a relative project dir is taken
    /// from `cwd`.
    pub fn resolve(config: &InstallConfig, cwd: &Path) -> Result<Self> {
        let global = match &config.global_dir {
            Some(dir) => dir.clone(),
            None => directories::BaseDirs::new()
                .map(|d| d.home_dir().join(".claude").join("skills"))
                .context("cannot determine the home directory for global installs")?,
        };
        Ok(Self {
            global,
            project: cwd.join(&config.project_dir),
        })
    }

    pub fn dir(&self, scope: InstallScope) -> &Path {
        match scope {
            InstallScope::Global => &self.global,
            InstallScope::Project => &self.project,
        }
    }
}

// ── Uninstall / listing ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UninstallOutcome {
    Removed {
        path: PathBuf,
    },
    /// Nothing at `path`. `elsewhere` is set when the other scope has it.
    NotFound {
        path: PathBuf,
        elsewhere: Option<(InstallScope, PathBuf)>,
    },
}

/// Remove `name` from `scope`. Never touches the other scope.
pub async fn uninstall(
    name: &str,
    scope: InstallScope,
    dirs: &InstallDirs,
) -> Result<UninstallOutcome> {
    check_install_name(name)?;
    let path = dirs.dir(scope).join(name);

    if !tokio::fs::try_exists(&path).await? {
        let other = scope.other();
        let other_path = dirs.dir(other).join(name);
        let elsewhere = tokio::fs::try_exists(&other_path)
            .await?
            .then_some((other, other_path));
        return Ok(UninstallOutcome::NotFound { path, elsewhere });
    }

    remove_path(&path).await?;
    info!(%name, %scope, path = %path.display(), "uninstalled skill");
    Ok(UninstallOutcome::Removed { path })
}

#[derive(Debug, Clone, Serialize)]
pub struct InstalledLocation {
    pub scope: InstallScope,
    pub path: PathBuf,
    pub skills: Vec<CatalogEntry>,
}

/// Installed bundles per scope. Scopes whose directory does not exist are omitted.
pub async fn list_installed(
    dirs: &InstallDirs,
    scopes: &[InstallScope],
) -> Result<Vec<InstalledLocation>> {
    let mut locations = Vec::new();
    for &scope in scopes {
        let path = dirs.dir(scope);
        if !path.is_dir() {
            debug!(%scope, path = %path.display(), "install directory does not exist");
            continue;
        }
        let catalog = discover::scan(path).await?;
        locations.push(InstalledLocation {
            scope,
            path: path.to_path_buf(),
            skills: catalog.entries,
        });
    }
    Ok(locations)
}
