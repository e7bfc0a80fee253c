use std::path::{Path, PathBuf};

use skillman_common::{FromMessage, error::BoxError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Walkdir(#[from] walkdir::Error),

    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to read skills directory {path}: {source}")]
    ScanRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid skill source '{source_ref}': expected 'owner/repo[/path]' or a path starting with /, ./ or ../")]
    InvalidSource { source_ref: String },

    #[error("{path} is not a skill directory: it must contain {file}")]
    MissingSkillMd { path: PathBuf, file: &'static str },

    #[error("invalid skill name '{name}': must be a single directory name")]
    InvalidSkillName { name: String },

    #[error("invalid metadata entry '{input}': expected key=value")]
    InvalidMetadataEntry { input: String },

    #[error("invalid tool '{input}': expected name:script:description")]
    InvalidToolSpec { input: String },

    #[error("GitHub API rate limit exceeded (HTTP {status}); try again later or set GITHUB_TOKEN")]
    RateLimited { status: u16 },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("unzip failed for {archive}: {stderr}")]
    UnzipFailed { archive: PathBuf, stderr: String },

    #[error("cannot install {bundle} into {target}: the target is inside the bundle")]
    TargetInsideSource { bundle: PathBuf, target: PathBuf },

    #[error("{path} has a malformed header: {reason}")]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("{path} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_source(source_ref: impl Into<String>) -> Self {
        Self::InvalidSource {
            source_ref: source_ref.into(),
        }
    }

    #[must_use]
    pub fn missing_skill_md(path: &Path) -> Self {
        Self::MissingSkillMd {
            path: path.to_path_buf(),
            file: crate::SKILL_MD,
        }
    }

    #[must_use]
    pub fn invalid_skill_name(name: impl Into<String>) -> Self {
        Self::InvalidSkillName { name: name.into() }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }

    fn from_context(context: String, source: BoxError) -> Self {
        Self::External { context, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

skillman_common::impl_context!();
