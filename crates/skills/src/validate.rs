//! Structural and naming checks for a single bundle.

use std::{fmt, path::Path};

use serde::Serialize;

use crate::{SKILL_MD, error::Result, parse};

const MAX_NAME_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 1024;
const MIN_DESCRIPTION_LEN: usize = 20;
const MIN_BODY_LEN: usize = 50;
const TODO_MARKER: &str = "[TODO:";

/// One finding. Whether it is an error or a warning depends on which list of
/// [`ValidationReport`] it lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Issue {
    MissingSkillMd,
    MissingName,
    NameTooLong { len: usize },
    NameFormat,
    NameConsecutiveHyphens,
    NameMismatch { dir: String, name: String },
    MissingDescription,
    DescriptionTooLong { len: usize },
    DescriptionTooShort { len: usize },
    BodyTooShort { len: usize },
    TodoPlaceholder,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSkillMd => write!(f, "{SKILL_MD} file not found"),
            Self::MissingName => f.write_str("missing required field: name"),
            Self::NameTooLong { len } => {
                write!(f, "name exceeds {MAX_NAME_LEN} character limit ({len})")
            },
            Self::NameFormat => f.write_str(
                "name format error: only lowercase letters, numbers, and hyphens allowed",
            ),
            Self::NameConsecutiveHyphens => f.write_str("name cannot contain consecutive hyphens"),
            Self::NameMismatch { dir, name } => {
                write!(f, "directory name '{dir}' does not match skill name '{name}'")
            },
            Self::MissingDescription => f.write_str("missing required field: description"),
            Self::DescriptionTooLong { len } => write!(
                f,
                "description exceeds {MAX_DESCRIPTION_LEN} character limit ({len})"
            ),
            Self::DescriptionTooShort { len } => write!(
                f,
                "description too short ({len}), recommend at least {MIN_DESCRIPTION_LEN} characters"
            ),
            Self::BodyTooShort { len } => write!(
                f,
                "{SKILL_MD} body too short ({len} characters), recommend adding more content"
            ),
            Self::TodoPlaceholder => f.write_str("contains incomplete [TODO: ...] placeholders"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// `^[a-z][a-z0-9-]*[a-z0-9]$`, except that any single-character name passes.
pub fn is_valid_skill_name(name: &str) -> bool {
    let chars: Vec<char> = name.chars().collect();
    match chars.as_slice() {
        [] => false,
        [_] => true,
        [first, middle @ .., last] => {
            first.is_ascii_lowercase()
                && middle
                    .iter()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
                && (last.is_ascii_lowercase() || last.is_ascii_digit())
        },
    }
}

/// Check the bundle at `dir`. All rules run; a missing `SKILL.md` is the one
/// exception and yields a single error.
pub async fn validate(dir: &Path) -> Result<ValidationReport> {
    let content = match tokio::fs::read_to_string(dir.join(SKILL_MD)).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ValidationReport {
                errors: vec![Issue::MissingSkillMd],
                warnings: Vec::new(),
            });
        },
        Err(e) => return Err(e.into()),
    };

    let dir_name = tokio::fs::canonicalize(dir)
        .await
        .unwrap_or_else(|_| dir.to_path_buf())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(check_document(&content, &dir_name))
}

/// Rules over already-read content. `dir_name` is the bundle directory's base name.
pub fn check_document(content: &str, dir_name: &str) -> ValidationReport {
    let doc = parse::parse_document(content);
    let mut report = ValidationReport::default();

    match doc.header.name() {
        None => report.errors.push(Issue::MissingName),
        Some(name) => {
            let len = name.chars().count();
            if len > MAX_NAME_LEN {
                report.errors.push(Issue::NameTooLong { len });
            }
            if !is_valid_skill_name(name) {
                report.errors.push(Issue::NameFormat);
            }
            if name.contains("--") {
                report.errors.push(Issue::NameConsecutiveHyphens);
            }
            if dir_name != name {
                report.warnings.push(Issue::NameMismatch {
                    dir: dir_name.to_string(),
                    name: name.to_string(),
                });
            }
        },
    }

    match doc.header.description() {
        None => report.errors.push(Issue::MissingDescription),
        Some(description) => {
            let len = description.chars().count();
            if len > MAX_DESCRIPTION_LEN {
                report.errors.push(Issue::DescriptionTooLong { len });
            }
            if len < MIN_DESCRIPTION_LEN {
                report.warnings.push(Issue::DescriptionTooShort { len });
            }
        },
    }

    let body_len = doc.body.trim().chars().count();
    if body_len < MIN_BODY_LEN {
        report.warnings.push(Issue::BodyTooShort { len: body_len });
    }
    if doc.body.contains(TODO_MARKER) {
        report.warnings.push(Issue::TodoPlaceholder);
    }

    report
}
