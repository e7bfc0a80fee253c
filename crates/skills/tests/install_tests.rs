#![allow(clippy::unwrap_used, clippy::expect_used)]
use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use {
    async_trait::async_trait,
    skillman_skills::{
        Error, Result, SKILL_MD,
        archive::ArchiveExtractor,
        github::{RepoHost, RepoInfo},
        install::{InstallOutcome, Installer, RemoteInstall, RepoRef, SkillSource, SourceInstall},
    },
};

/// Serves one repository with a fixed default branch.
struct FakeHost {
    repo: &'static str,
    default_branch: Option<&'static str>,
    downloads: Mutex<Vec<String>>,
}

impl FakeHost {
    fn new(repo: &'static str, default_branch: Option<&'static str>) -> Self {
        Self {
            repo,
            default_branch,
            downloads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RepoHost for FakeHost {
    async fn repo_info(&self, _owner: &str, repo: &str) -> Result<Option<RepoInfo>> {
        if repo != self.repo {
            return Ok(None);
        }
        Ok(Some(RepoInfo {
            default_branch: self.default_branch.map(str::to_string),
        }))
    }

    async fn download_zip(&self, _owner: &str, _repo: &str, branch: &str) -> Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(branch.to_string());
        Ok(b"PK fake".to_vec())
    }
}

/// Writes a fixed tree under `dest/<root>` instead of unpacking anything.
struct FakeExtractor {
    root: &'static str,
    files: Vec<(&'static str, String)>,
    fail: bool,
    seen_dest: Mutex<Option<PathBuf>>,
}

impl FakeExtractor {
    fn new(root: &'static str, files: Vec<(&'static str, String)>) -> Self {
        Self {
            root,
            files,
            fail: false,
            seen_dest: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("unused", Vec::new())
        }
    }

    fn dest(&self) -> PathBuf {
        self.seen_dest.lock().unwrap().clone().unwrap()
    }
}

#[async_trait]
impl ArchiveExtractor for FakeExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        *self.seen_dest.lock().unwrap() = Some(dest.to_path_buf());
        assert!(archive.is_file(), "archive should be written before extraction");
        if self.fail {
            return Err(Error::UnzipFailed {
                archive: archive.to_path_buf(),
                stderr: "corrupt".into(),
            });
        }
        for (rel, content) in &self.files {
            let path = dest.join(self.root).join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        Ok(())
    }
}

fn skill(name: &str) -> String {
    format!("---\nname: {name}\ndescription: Bundle called {name}\n---\n# {name}\n")
}

fn repo_ref(input: &str) -> RepoRef {
    match SkillSource::parse(input).unwrap() {
        SkillSource::Remote(r) => r,
        SkillSource::Local(p) => panic!("expected remote, got {}", p.display()),
    }
}

#[tokio::test]
async fn single_bundle_at_repo_root() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("pdf", Some("main"));
    let extractor = FakeExtractor::new("pdf-main", vec![
        (SKILL_MD, skill("pdf")),
        ("scripts/merge.py", "print('merge')\n".into()),
    ]);

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/pdf"), &host, &extractor)
        .await
        .unwrap();

    assert!(matches!(result, RemoteInstall::Single(InstallOutcome::Installed { ref name, .. }) if name == "pdf"));
    assert_eq!(result.installed_count(), 1);
    assert!(out.path().join("pdf/scripts/merge.py").is_file());
    assert!(!extractor.dest().exists());
}

#[tokio::test]
async fn nested_bundles_are_installed_individually() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("collection", Some("main"));
    let extractor = FakeExtractor::new("collection-main", vec![
        ("README.md", "# collection\n".into()),
        ("sub/a/SKILL.md", skill("alpha")),
        ("sub/b/SKILL.md", skill("beta")),
    ]);

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/collection"), &host, &extractor)
        .await
        .unwrap();

    let RemoteInstall::Multiple(attempts) = &result else {
        panic!("expected multiple bundles, got {result:?}");
    };
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].source, PathBuf::from("sub/a"));
    assert_eq!(result.installed_count(), 2);
    assert!(out.path().join("alpha").join(SKILL_MD).is_file());
    assert!(out.path().join("beta").join(SKILL_MD).is_file());
    assert!(!extractor.dest().exists());
}

#[tokio::test]
async fn subpath_selects_one_bundle() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("collection", Some("main"));
    let extractor = FakeExtractor::new("collection-main", vec![
        ("skills/pdf/SKILL.md", skill("pdf")),
        ("skills/xlsx/SKILL.md", skill("xlsx")),
    ]);

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/collection/skills/pdf"), &host, &extractor)
        .await
        .unwrap();

    assert!(matches!(result, RemoteInstall::Single(_)));
    assert!(out.path().join("pdf").is_dir());
    assert!(!out.path().join("xlsx").exists());
}

#[tokio::test]
async fn per_bundle_conflicts_do_not_stop_others() {
    let out = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(out.path().join("alpha")).unwrap();
    std::fs::write(out.path().join("alpha/keep.txt"), "mine").unwrap();

    let host = FakeHost::new("collection", Some("main"));
    let extractor = FakeExtractor::new("collection-main", vec![
        ("a/SKILL.md", skill("alpha")),
        ("b/SKILL.md", skill("beta")),
    ]);

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/collection"), &host, &extractor)
        .await
        .unwrap();

    let RemoteInstall::Multiple(attempts) = &result else {
        panic!("expected multiple bundles, got {result:?}");
    };
    assert!(matches!(
        attempts[0].result,
        Ok(InstallOutcome::AlreadyExists { .. })
    ));
    assert!(matches!(attempts[1].result, Ok(InstallOutcome::Installed { .. })));
    assert_eq!(result.installed_count(), 1);
    assert_eq!(
        std::fs::read_to_string(out.path().join("alpha/keep.txt")).unwrap(),
        "mine"
    );
}

#[tokio::test]
async fn missing_repository_is_reported_without_download() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("exists", Some("main"));
    let extractor = FakeExtractor::new("unused", Vec::new());

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/missing"), &host, &extractor)
        .await
        .unwrap();

    assert!(matches!(result, RemoteInstall::RepoNotFound { ref repo, .. } if repo == "missing"));
    assert!(host.downloads.lock().unwrap().is_empty());
    assert!(extractor.seen_dest.lock().unwrap().is_none());
}

#[tokio::test]
async fn no_bundle_in_snapshot() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("docs", Some("main"));
    let extractor = FakeExtractor::new("docs-main", vec![("README.md", "# docs\n".into())]);

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/docs"), &host, &extractor)
        .await
        .unwrap();

    assert!(matches!(result, RemoteInstall::NoBundleFound { .. }));
    assert_eq!(result.installed_count(), 0);
    assert!(!extractor.dest().exists());
}

#[tokio::test]
async fn extraction_failure_cleans_up() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("pdf", Some("main"));
    let extractor = FakeExtractor::failing();

    let err = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/pdf"), &host, &extractor)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnzipFailed { .. }));
    assert!(!extractor.dest().exists());
}

#[tokio::test]
async fn missing_default_branch_falls_back_to_main() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("pdf", None);
    let extractor = FakeExtractor::new("pdf-main", vec![(SKILL_MD, skill("pdf"))]);

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/pdf"), &host, &extractor)
        .await
        .unwrap();

    assert_eq!(host.downloads.lock().unwrap().as_slice(), ["main"]);
    assert_eq!(result.installed_count(), 1);
}

#[tokio::test]
async fn branch_with_slash_maps_to_archive_root() {
    let out = tempfile::tempdir().unwrap();
    let host = FakeHost::new("pdf", Some("release/v2"));
    let extractor = FakeExtractor::new("pdf-release-v2", vec![(SKILL_MD, skill("pdf"))]);

    let result = Installer::new(out.path(), false)
        .install_remote(&repo_ref("acme/pdf"), &host, &extractor)
        .await
        .unwrap();

    assert_eq!(host.downloads.lock().unwrap().as_slice(), ["release/v2"]);
    assert_eq!(result.installed_count(), 1);
}

#[tokio::test]
async fn install_dispatches_local_sources() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("local-skill");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join(SKILL_MD), skill("local-skill")).unwrap();

    let host = FakeHost::new("unused", None);
    let extractor = FakeExtractor::new("unused", Vec::new());
    let source = SkillSource::Local(src);

    let result = Installer::new(tmp.path().join("out"), false)
        .install(&source, &host, &extractor)
        .await
        .unwrap();

    assert!(matches!(result, SourceInstall::Local(InstallOutcome::Installed { .. })));
    assert!(host.downloads.lock().unwrap().is_empty());
}
