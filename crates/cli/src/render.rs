//! Text rendering shared by the command handlers.

use std::path::Path;

use {
    clap::ValueEnum,
    skillman_skills::{
        parse,
        types::{CatalogEntry, FullBundle},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Md,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Md => "md",
            Self::Json => "json",
        }
    }
}

/// Cut `text` to `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// The raw document between markers naming the skill.
pub fn wrapped_document(entry: &CatalogEntry, skill_md: &Path, content: &str) -> String {
    format!(
        "<!-- Skill: {name} -->\n<!-- Path: {path} -->\n\n{content}\n\n<!-- End of Skill: {name} -->\n",
        name = entry.name,
        path = skill_md.display(),
    )
}

/// Description plus the markdown headings of the body.
pub fn outline(entry: &CatalogEntry, skill_md: &Path, content: &str) -> String {
    let doc = parse::parse_document(content);
    let headings: Vec<&str> = doc
        .body
        .lines()
        .filter(|line| line.starts_with('#'))
        .collect();
    format!(
        "# Skill: {name}\n\n## Description\n{description}\n\n## Structure\n{headings}\n\n## Full path\n{path}\n\n---\nRun `skillman load {name}` for the full content.\n",
        name = entry.name,
        description = entry.description,
        headings = headings.join("\n"),
        path = skill_md.display(),
    )
}

/// Body plus a listing of the bundle's resource files.
pub fn export_markdown(bundle: &FullBundle) -> String {
    let mut out = format!(
        "# {}\n\n> {}\n\n---\n\n{}\n\n---\n\n## Resources\n",
        bundle.entry.name,
        bundle.entry.description,
        bundle.body.trim_start()
    );
    let sections = [
        ("Scripts", &bundle.scripts),
        ("References", &bundle.references),
        ("Assets", &bundle.assets),
    ];
    for (title, files) in sections {
        if files.is_empty() {
            continue;
        }
        out.push_str(&format!("\n### {title}\n"));
        for file in files {
            out.push_str(&format!("- `{file}`\n"));
        }
    }
    out
}
