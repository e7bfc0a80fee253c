//! Configuration loading and environment overrides.
//!
//! Config files: `skillman.toml`, `skillman.yaml`, `skillman.yml` or `skillman.json`.
//! Searched in `./` then the user config directory (`~/.config/skillman/` on Linux).

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, apply_env_overrides_with, config_dir, discover_and_load,
        load_config, load_from,
    },
    schema::{GithubConfig, InstallConfig, SkillmanConfig},
};
