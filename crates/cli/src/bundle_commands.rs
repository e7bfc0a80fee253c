//! Commands that work on a single bundle directory: init, validate, set.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use {
    clap::Args,
    skillman_config::SkillmanConfig,
    skillman_skills::{
        mutate::{self, Edit, SkillDocument},
        scaffold,
        types::{MetadataEntry, Tool},
        validate,
    },
};

use crate::catalog_commands;

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Skill directory to edit.
    pub path: PathBuf,
    #[arg(short, long)]
    pub name: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub license: Option<String>,
    #[arg(short, long)]
    pub compatibility: Option<String>,
    /// Add or replace a tool, as `name:script:description`. Repeatable.
    #[arg(long, value_name = "SPEC")]
    pub add_tool: Vec<Tool>,
    /// Remove a tool by name. Repeatable.
    #[arg(long, value_name = "NAME")]
    pub remove_tool: Vec<String>,
    /// Set a metadata entry, as `key=value`. Repeatable.
    #[arg(long, value_name = "KEY=VALUE")]
    pub set_meta: Vec<MetadataEntry>,
    /// Print the declared tools.
    #[arg(long)]
    pub list_tools: bool,
}

impl SetArgs {
    /// Edits in application order: fields, metadata, tool additions, tool removals.
    fn into_edits(self) -> (PathBuf, bool, Vec<Edit>) {
        let mut edits = Vec::new();
        edits.extend(self.name.map(Edit::Name));
        edits.extend(self.description.map(Edit::Description));
        edits.extend(self.license.map(Edit::License));
        edits.extend(self.compatibility.map(Edit::Compatibility));
        edits.extend(self.set_meta.into_iter().map(Edit::Metadata));
        edits.extend(self.add_tool.into_iter().map(Edit::AddTool));
        edits.extend(self.remove_tool.into_iter().map(Edit::RemoveTool));
        (self.path, self.list_tools, edits)
    }
}

pub async fn handle_init(
    config: &SkillmanConfig,
    cwd: &Path,
    name: &str,
    path: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let base = path.unwrap_or_else(|| catalog_commands::catalog_root(config, cwd).path);
    let dir = scaffold::create_skill(&base, name).await?;

    println!("Created skill: {}\n", dir.display());
    println!("  {name}/");
    println!("  ├── SKILL.md");
    println!("  ├── scripts/");
    println!("  │   └── example.sh");
    println!("  ├── references/");
    println!("  │   └── README.md");
    println!("  └── assets/");
    println!("\nNext: fill in the [TODO] placeholders in SKILL.md, then run:");
    println!("  skillman validate {}", dir.display());
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_validate(path: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let report = validate::validate(path).await?;
    let code = if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(code);
    }

    println!("Validating: {}\n", path.display());
    if !report.errors.is_empty() {
        println!("Errors:");
        for issue in &report.errors {
            println!("  ✗ {issue}");
        }
        println!();
    }
    if !report.warnings.is_empty() {
        println!("Warnings:");
        for issue in &report.warnings {
            println!("  ! {issue}");
        }
        println!();
    }
    if report.is_clean() {
        println!("✓ Skill is valid");
    } else if report.is_valid() {
        println!(
            "✓ Skill is valid ({} warning(s))",
            report.warnings.len()
        );
    } else {
        println!("✗ Skill has {} error(s)", report.errors.len());
    }
    Ok(code)
}

pub async fn handle_set(args: SetArgs) -> anyhow::Result<ExitCode> {
    let (path, list_tools, edits) = args.into_edits();

    if edits.is_empty() {
        let doc = SkillDocument::open(&path).await?;
        if list_tools {
            print_tools(doc.tools());
        } else {
            print_header(&doc);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let report = mutate::apply_edits(&path, edits).await?;
    for effect in &report.effects {
        let mark = if effect.is_warning() { "!" } else { "✓" };
        println!("{mark} {effect}");
    }
    if report.saved {
        println!("\nSaved {}", report.path.display());
    } else {
        println!("\nNo changes written.");
    }

    if list_tools {
        let doc = SkillDocument::open(&path).await?;
        print_tools(doc.tools());
    }
    Ok(ExitCode::SUCCESS)
}

fn print_header(doc: &SkillDocument) {
    let header = doc.header();
    println!("File: {}\n", doc.path().display());
    println!("name:          {}", header.name().unwrap_or("(missing)"));
    println!("description:   {}", header.description().unwrap_or("(missing)"));
    if let Some(ref license) = header.license {
        println!("license:       {license}");
    }
    if let Some(ref compatibility) = header.compatibility {
        println!("compatibility: {compatibility}");
    }
    if let Some(ref metadata) = header.metadata {
        println!("metadata:");
        for (key, value) in metadata {
            println!("  {key}: {value}");
        }
    }
    if !doc.tools().is_empty() {
        println!();
        print_tools(doc.tools());
    }
}

fn print_tools(tools: &[Tool]) {
    if tools.is_empty() {
        println!("No tools declared.");
        return;
    }
    println!("Tools ({}):", tools.len());
    for tool in tools {
        println!("  {} -> {}", tool.name, tool.script);
        if !tool.description.is_empty() {
            println!("    {}", tool.description);
        }
    }
}
