use std::{collections::BTreeMap, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::Error, parse::Header};

// ── Catalog records ─────────────────────────────────────────────────────────

/// Lightweight record for one bundle found by a catalog scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    /// Bundle directory.
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl CatalogEntry {
    /// Build an entry from a decoded header, applying the fallbacks used by the
    /// loader: a missing or empty `name` becomes `fallback_name`, a missing or
    /// empty `description` becomes empty.
    pub fn with_fallbacks(header: Header, path: PathBuf, fallback_name: &str) -> Self {
        let name = header.name().unwrap_or(fallback_name).to_string();
        let description = header.description().unwrap_or_default().to_string();
        Self {
            name,
            description,
            path,
            license: header.license,
            compatibility: header.compatibility,
            metadata: header.metadata,
            tools: header.tools,
        }
    }
}

/// A bundle with its body and resource files, loaded on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullBundle {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    /// Markdown after the frontmatter block, unmodified.
    pub body: String,
    /// Paths relative to the bundle root, `/`-separated.
    pub scripts: Vec<String>,
    pub references: Vec<String>,
    pub assets: Vec<String>,
}

// ── Header values ───────────────────────────────────────────────────────────

/// A script exposed by a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    /// Relative to the bundle root.
    pub script: String,
    #[serde(default)]
    pub description: String,
}

impl FromStr for Tool {
    type Err = Error;

    /// Parses `name:script:description`; the description may itself contain `:`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidToolSpec {
            input: input.to_string(),
        };
        let mut parts = input.splitn(3, ':');
        let (Some(name), Some(script), Some(description)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if name.trim().is_empty() || script.trim().is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.trim().to_string(),
            script: script.trim().to_string(),
            description: description.to_string(),
        })
    }
}

/// One `key=value` pair destined for the `metadata` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl FromStr for MetadataEntry {
    type Err = Error;

    /// Splits on the first `=`; both sides must be non-empty.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(Error::InvalidMetadataEntry {
                input: input.to_string(),
            }),
        }
    }
}
