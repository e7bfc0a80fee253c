//! Catalog commands: list, search, show, load, export.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use {
    skillman_config::SkillmanConfig,
    skillman_skills::{
        SKILL_MD,
        discover::{self, Catalog, CatalogRoot},
        loader,
        types::CatalogEntry,
    },
    tracing::debug,
};

use crate::render::{self, ExportFormat};

pub fn catalog_root(config: &SkillmanConfig, cwd: &Path) -> CatalogRoot {
    discover::resolve_catalog_root(cwd, config.skills_dir.as_deref())
}

async fn scan_catalog(config: &SkillmanConfig, cwd: &Path) -> anyhow::Result<(PathBuf, Catalog)> {
    let root = catalog_root(config, cwd);
    debug!(path = %root.path.display(), origin = ?root.origin, "catalog root");
    let catalog = discover::scan(&root.path).await?;
    Ok((root.path, catalog))
}

async fn find_entry(
    config: &SkillmanConfig,
    cwd: &Path,
    name: &str,
) -> anyhow::Result<Option<CatalogEntry>> {
    let (_, catalog) = scan_catalog(config, cwd).await?;
    Ok(catalog.find(name).cloned())
}

fn not_found(name: &str) -> ExitCode {
    eprintln!("Skill not found: {name}");
    eprintln!("Run `skillman list` to see available skills.");
    ExitCode::FAILURE
}

pub async fn handle_list(
    config: &SkillmanConfig,
    cwd: &Path,
    verbose: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let (root, catalog) = scan_catalog(config, cwd).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog.entries)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Scanning: {}\n", root.display());
    if catalog.entries.is_empty() {
        println!("No skills found.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Found {} skill(s):\n", catalog.entries.len());
    if verbose {
        for skill in &catalog.entries {
            println!("  {}", skill.name);
            println!("    {}", render::truncate(&skill.description, 100));
            println!("    path: {}", skill.path.display());
            if let Some(ref license) = skill.license {
                println!("    license: {license}");
            }
            println!();
        }
    } else {
        let width = catalog
            .entries
            .iter()
            .map(|s| s.name.chars().count())
            .max()
            .unwrap_or(0);
        for skill in &catalog.entries {
            println!(
                "  {:<width$}  {}",
                skill.name,
                render::truncate(&skill.description, 60)
            );
        }
        println!("\nUse --verbose for details.");
    }
    if !catalog.skipped.is_empty() {
        println!("\n{} SKILL.md file(s) skipped:", catalog.skipped.len());
        for skipped in &catalog.skipped {
            println!("  {} ({})", skipped.path.display(), skipped.reason);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_search(
    config: &SkillmanConfig,
    cwd: &Path,
    query: &str,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let (_, catalog) = scan_catalog(config, cwd).await?;
    let matches = catalog.search(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(ExitCode::SUCCESS);
    }
    if matches.is_empty() {
        println!("No skills matching '{query}'.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Found {} match(es):\n", matches.len());
    for skill in matches {
        println!("  {}", skill.name);
        println!("    {}", render::truncate(&skill.description, 120));
        println!("    path: {}\n", skill.path.display());
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_show(
    config: &SkillmanConfig,
    cwd: &Path,
    name: &str,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let Some(entry) = find_entry(config, cwd, name).await? else {
        return Ok(not_found(name));
    };
    let Some(bundle) = loader::load_bundle(&entry.path).await else {
        return Ok(not_found(name));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(ExitCode::SUCCESS);
    }

    let rule = "=".repeat(60);
    println!("{rule}\n  {}\n{rule}\n", bundle.entry.name);
    println!("Description:\n  {}\n", bundle.entry.description);
    println!("Path: {}\n", bundle.entry.path.display());
    if let Some(ref license) = bundle.entry.license {
        println!("License: {license}\n");
    }
    if let Some(ref compatibility) = bundle.entry.compatibility {
        println!("Compatibility: {compatibility}\n");
    }
    if let Some(ref tools) = bundle.entry.tools {
        println!("Tools:");
        for tool in tools {
            println!("  - {} ({}): {}", tool.name, tool.script, tool.description);
        }
        println!();
    }
    for (title, files) in [
        ("Scripts", &bundle.scripts),
        ("References", &bundle.references),
        ("Assets", &bundle.assets),
    ] {
        if files.is_empty() {
            continue;
        }
        println!("{title}:");
        for file in files {
            println!("  - {file}");
        }
        println!();
    }
    println!("{}", "-".repeat(60));
    println!("skillman load {name}            # full content");
    println!("skillman load {name} --outline  # outline only");
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_load(
    config: &SkillmanConfig,
    cwd: &Path,
    name: &str,
    outline: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let Some(entry) = find_entry(config, cwd, name).await? else {
        return Ok(not_found(name));
    };
    let skill_md = entry.path.join(SKILL_MD);
    let content = tokio::fs::read_to_string(&skill_md).await?;

    let text = if outline {
        render::outline(&entry, &skill_md, &content)
    } else {
        render::wrapped_document(&entry, &skill_md, &content)
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, text).await?;
            println!("Saved to {}", path.display());
        },
        None => print!("{text}"),
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_export(
    config: &SkillmanConfig,
    cwd: &Path,
    name: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let Some(entry) = find_entry(config, cwd, name).await? else {
        return Ok(not_found(name));
    };
    let Some(bundle) = loader::load_bundle(&entry.path).await else {
        return Ok(not_found(name));
    };

    let text = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&bundle)?,
        ExportFormat::Md => render::export_markdown(&bundle),
    };
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{name}.{}", format.extension())));
    tokio::fs::write(&path, text).await?;
    println!("Exported to {}", path.display());
    Ok(ExitCode::SUCCESS)
}
