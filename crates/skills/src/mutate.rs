//! In-place edits of a bundle's frontmatter.
//!
//! Edits are applied to the decoded header in memory; [`SkillDocument::save`]
//! writes the whole file once, with the body unchanged.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use {serde::Serialize, tracing::info};

use crate::{
    SKILL_MD,
    error::{Error, Result},
    parse::{self, Header},
    types::{MetadataEntry, Tool},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChange {
    Added,
    Replaced,
}

/// A decoded `SKILL.md` open for editing.
#[derive(Debug, Clone)]
pub struct SkillDocument {
    path: PathBuf,
    header: Header,
    body: String,
    modified: bool,
}

impl SkillDocument {
    /// Fails with [`Error::MalformedHeader`] when the frontmatter does not decode.
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(SKILL_MD);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::missing_skill_md(dir));
            },
            Err(e) => return Err(e.into()),
        };
        let doc = parse::parse_document(&content);
        if let Some(reason) = doc.header_error {
            return Err(Error::MalformedHeader { path, reason });
        }
        Ok(Self {
            path,
            header: doc.header,
            body: doc.body,
            modified: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.header.name = Some(name.into());
        self.modified = true;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.header.description = Some(description.into());
        self.modified = true;
    }

    pub fn set_license(&mut self, license: impl Into<String>) {
        self.header.license = Some(license.into());
        self.modified = true;
    }

    pub fn set_compatibility(&mut self, compatibility: impl Into<String>) {
        self.header.compatibility = Some(compatibility.into());
        self.modified = true;
    }

    pub fn set_metadata_entry(&mut self, entry: MetadataEntry) {
        self.header
            .metadata
            .get_or_insert_with(Default::default)
            .insert(entry.key, entry.value);
        self.modified = true;
    }

    /// Replace the tool with the same name in place, or append.
    pub fn add_tool(&mut self, tool: Tool) -> ToolChange {
        let tools = self.header.tools.get_or_insert_with(Vec::new);
        self.modified = true;
        match tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => {
                *existing = tool;
                ToolChange::Replaced
            },
            None => {
                tools.push(tool);
                ToolChange::Added
            },
        }
    }

    /// Returns whether a tool was removed.
    pub fn remove_tool(&mut self, name: &str) -> bool {
        let Some(tools) = self.header.tools.as_mut() else {
            return false;
        };
        let before = tools.len();
        tools.retain(|t| t.name != name);
        let removed = tools.len() < before;
        self.modified |= removed;
        removed
    }

    pub fn tools(&self) -> &[Tool] {
        self.header.tools.as_deref().unwrap_or_default()
    }

    /// Rewrite `SKILL.md` through a temporary file and rename.
    pub async fn save(&mut self) -> Result<()> {
        let content = parse::render_document(&self.header, &self.body)?;
        let tmp = self.path.with_extension("md.tmp");
        tokio::fs::write(&tmp, content).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        self.modified = false;
        info!(path = %self.path.display(), "saved SKILL.md");
        Ok(())
    }
}

/// One requested change. Inputs are already parsed, so applying edits does
/// no validation of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Name(String),
    Description(String),
    License(String),
    Compatibility(String),
    Metadata(MetadataEntry),
    AddTool(Tool),
    RemoveTool(String),
}

/// What an [`Edit`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EditEffect {
    NameSet { name: String },
    DescriptionSet,
    LicenseSet { license: String },
    CompatibilitySet,
    MetadataSet { key: String, value: String },
    ToolAdded { name: String },
    ToolReplaced { name: String },
    ToolRemoved { name: String },
    /// Warning only; the document is not changed.
    ToolNotFound { name: String },
}

impl fmt::Display for EditEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameSet { name } => write!(f, "name set to '{name}'"),
            Self::DescriptionSet => f.write_str("description updated"),
            Self::LicenseSet { license } => write!(f, "license set to '{license}'"),
            Self::CompatibilitySet => f.write_str("compatibility updated"),
            Self::MetadataSet { key, value } => write!(f, "metadata {key} = {value}"),
            Self::ToolAdded { name } => write!(f, "tool '{name}' added"),
            Self::ToolReplaced { name } => write!(f, "tool '{name}' updated"),
            Self::ToolRemoved { name } => write!(f, "tool '{name}' removed"),
            Self::ToolNotFound { name } => write!(f, "tool '{name}' not found"),
        }
    }
}

impl EditEffect {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    pub path: PathBuf,
    pub effects: Vec<EditEffect>,
    pub saved: bool,
}

impl SkillDocument {
    pub fn apply(&mut self, edit: Edit) -> EditEffect {
        match edit {
            Edit::Name(name) => {
                self.set_name(name.clone());
                EditEffect::NameSet { name }
            },
            Edit::Description(description) => {
                self.set_description(description);
                EditEffect::DescriptionSet
            },
            Edit::License(license) => {
                self.set_license(license.clone());
                EditEffect::LicenseSet { license }
            },
            Edit::Compatibility(compatibility) => {
                self.set_compatibility(compatibility);
                EditEffect::CompatibilitySet
            },
            Edit::Metadata(entry) => {
                let effect = EditEffect::MetadataSet {
                    key: entry.key.clone(),
                    value: entry.value.clone(),
                };
                self.set_metadata_entry(entry);
                effect
            },
            Edit::AddTool(tool) => {
                let name = tool.name.clone();
                match self.add_tool(tool) {
                    ToolChange::Added => EditEffect::ToolAdded { name },
                    ToolChange::Replaced => EditEffect::ToolReplaced { name },
                }
            },
            Edit::RemoveTool(name) => {
                if self.remove_tool(&name) {
                    EditEffect::ToolRemoved { name }
                } else {
                    EditEffect::ToolNotFound { name }
                }
            },
        }
    }
}

/// Apply `edits` in order to the bundle at `dir` and save once if anything changed.
pub async fn apply_edits(dir: &Path, edits: Vec<Edit>) -> Result<EditReport> {
    let mut doc = SkillDocument::open(dir).await?;
    let effects: Vec<EditEffect> = edits.into_iter().map(|e| doc.apply(e)).collect();

    let saved = doc.is_modified();
    if saved {
        doc.save().await?;
    }
    Ok(EditReport {
        path: doc.path().to_path_buf(),
        effects,
        saved,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "---\nname: pdf\ndescription: PDF helpers for documents\nhomepage: https://example.com\ntools:\n  - name: merge\n    script: scripts/merge.py\n    description: Merge files\n  - name: split\n    script: scripts/split.py\n    description: Split files\n---\n# PDF\n\nBody stays   exactly.\n";

    fn bundle() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(SKILL_MD), ORIGINAL).unwrap();
        tmp
    }

    fn tool(spec: &str) -> Tool {
        spec.parse().unwrap()
    }

    fn reread(dir: &Path) -> parse::Document {
        parse::parse_document(&std::fs::read_to_string(dir.join(SKILL_MD)).unwrap())
    }

    #[tokio::test]
    async fn test_add_tool_twice_replaces_in_place() {
        let tmp = bundle();
        apply_edits(tmp.path(), vec![Edit::AddTool(tool("merge:scripts/merge.py:first"))])
            .await
            .unwrap();
        let report = apply_edits(tmp.path(), vec![Edit::AddTool(tool(
            "merge:scripts/merge2.py:second",
        ))])
        .await
        .unwrap();
        assert_eq!(report.effects, [EditEffect::ToolReplaced {
            name: "merge".into()
        }]);

        let tools = reread(tmp.path()).header.tools.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "merge");
        assert_eq!(tools[0].description, "second");
        assert_eq!(tools[0].script, "scripts/merge2.py");
        assert_eq!(tools[1].name, "split");
    }

    #[tokio::test]
    async fn test_add_new_tool_appends() {
        let tmp = bundle();
        apply_edits(tmp.path(), vec![Edit::AddTool(tool("info:scripts/info.py:Show info"))])
            .await
            .unwrap();
        let tools = reread(tmp.path()).header.tools.unwrap();
        assert_eq!(
            tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            ["merge", "split", "info"]
        );
    }

    #[tokio::test]
    async fn test_remove_missing_tool_is_warning_without_write() {
        let tmp = bundle();
        let report = apply_edits(tmp.path(), vec![Edit::RemoveTool("nope".into())])
            .await
            .unwrap();
        assert!(!report.saved);
        assert!(report.effects[0].is_warning());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(SKILL_MD)).unwrap(),
            ORIGINAL
        );
    }

    #[tokio::test]
    async fn test_multiple_edits_single_save_preserves_body_and_extra() {
        let tmp = bundle();
        let report = apply_edits(tmp.path(), vec![
            Edit::Name("pdf-tools".into()),
            Edit::License("MIT".into()),
            Edit::Metadata("version=1.0=beta".parse().unwrap()),
            Edit::RemoveTool("split".into()),
        ])
        .await
        .unwrap();
        assert!(report.saved);
        assert_eq!(report.effects.len(), 4);

        let doc = reread(tmp.path());
        assert_eq!(doc.header.name(), Some("pdf-tools"));
        assert_eq!(doc.header.license.as_deref(), Some("MIT"));
        assert_eq!(doc.header.metadata.unwrap()["version"], "1.0=beta");
        assert_eq!(doc.header.tools.unwrap().len(), 1);
        assert!(doc.header.extra.contains_key("homepage"));
        assert_eq!(doc.body, "# PDF\n\nBody stays   exactly.\n");
        assert!(!tmp.path().join("SKILL.md.tmp").exists());
    }

    #[tokio::test]
    async fn test_document_without_frontmatter_gains_one() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(SKILL_MD), "Plain body.\n").unwrap();

        let mut doc = SkillDocument::open(tmp.path()).await.unwrap();
        doc.set_description("Now described");
        doc.save().await.unwrap();

        let content = std::fs::read_to_string(tmp.path().join(SKILL_MD)).unwrap();
        assert_eq!(content, "---\ndescription: Now described\n---\nPlain body.\n");
    }

    #[tokio::test]
    async fn test_malformed_header_is_never_rewritten() {
        let tmp = tempfile::tempdir().unwrap();
        let original = "---\nname: pdf\ndescription: PDF helpers: merge and split\nlicense: MIT\n---\n# PDF\n";
        std::fs::write(tmp.path().join(SKILL_MD), original).unwrap();

        let err = apply_edits(tmp.path(), vec![Edit::Compatibility("python3".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { .. }));
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(SKILL_MD)).unwrap(),
            original
        );
        assert!(!tmp.path().join("SKILL.md.tmp").exists());
    }

    #[tokio::test]
    async fn test_open_missing_skill_md() {
        let tmp = tempfile::tempdir().unwrap();
        let err = SkillDocument::open(tmp.path()).await.unwrap_err();
        assert!(matches!(err, Error::MissingSkillMd { .. }));
    }
}
