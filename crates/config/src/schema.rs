//! Config schema: catalog root, install locations, and the remote host.
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillmanConfig {
    /// Catalog root used by list/search/show/load. `SKILLS_DIR` takes precedence.
    pub skills_dir: Option<PathBuf>,
    pub install: InstallConfig,
    pub github: GithubConfig,
}

/// Where bundles are installed and how archives are unpacked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Global install root. Defaults to `~/.claude/skills`.
    pub global_dir: Option<PathBuf>,
    /// Project install root, relative to the working directory unless absolute.
    pub project_dir: PathBuf,
    /// External program used to unpack downloaded zip snapshots.
    pub unzip_program: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            global_dir: None,
            project_dir: PathBuf::from(".claude/skills"),
            unzip_program: "unzip".into(),
        }
    }
}

/// Remote repository host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base (repository info, search).
    pub api_url: String,
    /// Base for branch zip snapshots (`{archive_url}/{owner}/{repo}/archive/refs/heads/{branch}.zip`).
    pub archive_url: String,
    pub user_agent: String,
    /// Personal access token; raises the API rate limit.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".into(),
            archive_url: "https://github.com".into(),
            user_agent: "skillman".into(),
            token: None,
        }
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: SkillmanConfig = toml::from_str("").unwrap();
        assert!(config.skills_dir.is_none());
        assert_eq!(config.install.project_dir, PathBuf::from(".claude/skills"));
        assert_eq!(config.install.unzip_program, "unzip");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert!(config.github.token.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: SkillmanConfig = toml::from_str(
            r#"
[github]
token = "ghp_example"

[install]
unzip_program = "/usr/local/bin/unzip"
"#,
        )
        .unwrap();
        assert_eq!(config.github.user_agent, "skillman");
        assert_eq!(
            config.github.token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("ghp_example")
        );
        assert_eq!(config.install.unzip_program, "/usr/local/bin/unzip");
        assert_eq!(config.install.project_dir, PathBuf::from(".claude/skills"));
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let mut config = SkillmanConfig::default();
        config.github.token = Some(Secret::new("ghp_secret".into()));
        assert!(!format!("{config:?}").contains("ghp_secret"));
    }
}
