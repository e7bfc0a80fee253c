use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    schema::SkillmanConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "skillman.toml",
    "skillman.yaml",
    "skillman.yml",
    "skillman.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SkillmanConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./skillman.{toml,yaml,yml,json}` (project-local)
/// 2. `<config dir>/skillman.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SkillmanConfig::default()` if no config file is found or the one
/// found cannot be loaded.
pub fn discover_and_load() -> SkillmanConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    SkillmanConfig::default()
}

/// Load from an explicit path when given (failure is an error), otherwise
/// discover. Environment overrides are applied in both cases.
pub fn load_from(explicit: Option<&Path>) -> Result<SkillmanConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Returns the user-global config directory (`~/.config/skillman/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "skillman").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            let dir = config_dir()?;
            CONFIG_FILENAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.exists())
        })
}

/// Apply `SKILLS_DIR`, `GITHUB_TOKEN` and `SKILLMAN_GITHUB_API_URL` from the
/// process environment.
pub fn apply_env_overrides(config: &mut SkillmanConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Same as [`apply_env_overrides`] with a custom lookup, so it can be tested
/// without touching the process environment. Empty values are ignored.
pub fn apply_env_overrides_with(
    config: &mut SkillmanConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(dir) = get("SKILLS_DIR") {
        config.skills_dir = Some(PathBuf::from(dir));
    }
    if let Some(token) = get("GITHUB_TOKEN") {
        config.github.token = Some(Secret::new(token));
    }
    if let Some(url) = get("SKILLMAN_GITHUB_API_URL") {
        config.github.api_url = url;
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<SkillmanConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
