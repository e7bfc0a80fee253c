//! Install, uninstall, installed and github commands.

use std::{path::Path, process::ExitCode};

use {
    skillman_config::SkillmanConfig,
    skillman_skills::{
        archive::UnzipCommand,
        github::GithubClient,
        install::{
            self, InstallDirs, InstallOutcome, InstallScope, Installer, RemoteInstall,
            SkillSource, SourceInstall, UninstallOutcome,
        },
    },
    tracing::info,
};

use crate::render;

fn scope(global: bool) -> InstallScope {
    if global {
        InstallScope::Global
    } else {
        InstallScope::Project
    }
}

pub async fn handle_install(
    config: &SkillmanConfig,
    cwd: &Path,
    source: &str,
    global: bool,
    force: bool,
) -> anyhow::Result<ExitCode> {
    let dirs = InstallDirs::resolve(&config.install, cwd)?;
    let scope = scope(global);
    let source = SkillSource::parse(source)?;
    let host = GithubClient::new(&config.github)?;
    let extractor = UnzipCommand::new(&config.install.unzip_program);
    let installer = Installer::new(dirs.dir(scope), force);

    println!("Installing into {} ({scope})\n", installer.install_dir().display());
    let result = installer.install(&source, &host, &extractor).await?;
    info!(%scope, "install finished");

    let ok = match result {
        SourceInstall::Local(outcome) => {
            print_outcome(&outcome, force);
            true
        },
        SourceInstall::Remote(remote) => print_remote(&remote, force),
    };
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_outcome(outcome: &InstallOutcome, force: bool) {
    match outcome {
        InstallOutcome::Installed { name, path } => {
            println!("✓ Installed {name} -> {}", path.display());
        },
        InstallOutcome::AlreadyExists { name, path } => {
            println!("! {name} already exists at {}", path.display());
            if !force {
                println!("  Use --force to replace it.");
            }
        },
    }
}

/// Returns false when nothing from the repository could be installed or kept.
fn print_remote(remote: &RemoteInstall, force: bool) -> bool {
    match remote {
        RemoteInstall::RepoNotFound { owner, repo } => {
            eprintln!("✗ Repository not found: {owner}/{repo}");
            false
        },
        RemoteInstall::NoBundleFound { searched } => {
            eprintln!("✗ No SKILL.md found in {searched}");
            false
        },
        RemoteInstall::Single(outcome) => {
            print_outcome(outcome, force);
            true
        },
        RemoteInstall::Multiple(attempts) => {
            println!("Found {} skills:\n", attempts.len());
            let mut failed = 0;
            for attempt in attempts {
                match &attempt.result {
                    Ok(outcome) => print_outcome(outcome, force),
                    Err(e) => {
                        failed += 1;
                        eprintln!("✗ {}: {e}", attempt.source.display());
                    },
                }
            }
            println!("\n{} of {} installed", remote.installed_count(), attempts.len());
            failed < attempts.len()
        },
    }
}

pub async fn handle_uninstall(
    config: &SkillmanConfig,
    cwd: &Path,
    name: &str,
    global: bool,
) -> anyhow::Result<ExitCode> {
    let dirs = InstallDirs::resolve(&config.install, cwd)?;
    match install::uninstall(name, scope(global), &dirs).await? {
        UninstallOutcome::Removed { path } => {
            println!("✓ Removed {name} ({})", path.display());
            Ok(ExitCode::SUCCESS)
        },
        UninstallOutcome::NotFound { path, elsewhere } => {
            eprintln!("✗ {name} is not installed at {}", path.display());
            if let Some((other, other_path)) = elsewhere {
                let flag = other.flag().map(|f| format!(" {f}")).unwrap_or_default();
                eprintln!(
                    "  Found in the {other} directory ({}). Run `skillman uninstall {name}{flag}`.",
                    other_path.display()
                );
            }
            Ok(ExitCode::FAILURE)
        },
    }
}

pub async fn handle_installed(
    config: &SkillmanConfig,
    cwd: &Path,
    global: bool,
    project: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let dirs = InstallDirs::resolve(&config.install, cwd)?;
    let scopes: &[InstallScope] = match (global, project) {
        (true, false) => &[InstallScope::Global],
        (false, true) => &[InstallScope::Project],
        _ => &[InstallScope::Project, InstallScope::Global],
    };
    let locations = install::list_installed(&dirs, scopes).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&locations)?);
        return Ok(ExitCode::SUCCESS);
    }
    if locations.iter().all(|l| l.skills.is_empty()) {
        println!("No installed skills.");
        return Ok(ExitCode::SUCCESS);
    }

    for location in &locations {
        println!("{} ({}):", location.scope, location.path.display());
        if location.skills.is_empty() {
            println!("  (none)\n");
            continue;
        }
        for skill in &location.skills {
            println!(
                "  {}  {}",
                skill.name,
                render::truncate(&skill.description, 60)
            );
        }
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_github(
    config: &SkillmanConfig,
    query: &str,
    limit: u32,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let client = GithubClient::new(&config.github)?;
    let hits = client.search_repositories(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(ExitCode::SUCCESS);
    }
    if hits.is_empty() {
        println!("No repositories matching '{query}'.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Found {} repositories:\n", hits.len());
    for hit in &hits {
        println!("  {}  ★ {}", hit.full_name, hit.stargazers_count);
        if let Some(ref description) = hit.description {
            println!("    {}", render::truncate(description, 100));
        }
        if !hit.topics.is_empty() {
            let topics: Vec<&str> = hit.topics.iter().take(5).map(String::as_str).collect();
            println!("    topics: {}", topics.join(", "));
        }
        println!("    {}", hit.html_url);
        println!("    install: skillman install {}\n", hit.full_name);
    }
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, skillman_config::InstallConfig};

    fn config(root: &Path) -> SkillmanConfig {
        SkillmanConfig {
            install: InstallConfig {
                global_dir: Some(root.join("global")),
                project_dir: "skills".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn local_install_then_uninstall() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src/pdf");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("SKILL.md"),
            "---\nname: pdf\ndescription: PDF helpers\n---\n# PDF\n",
        )
        .unwrap();
        let config = config(tmp.path());

        let code = handle_install(&config, tmp.path(), src.to_str().unwrap(), false, false)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(tmp.path().join("skills/pdf/SKILL.md").is_file());

        let code = handle_uninstall(&config, tmp.path(), "pdf", true)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(tmp.path().join("skills/pdf").exists());

        let code = handle_uninstall(&config, tmp.path(), "pdf", false)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!tmp.path().join("skills/pdf").exists());
    }

    #[test]
    fn failed_remote_results_are_failures() {
        let not_found = RemoteInstall::RepoNotFound {
            owner: "acme".into(),
            repo: "none".into(),
        };
        assert!(!print_remote(&not_found, false));
        let empty = RemoteInstall::NoBundleFound {
            searched: "acme/docs".into(),
        };
        assert!(!print_remote(&empty, false));
    }
}
