use super::{GatekeepConfig, smart_load};
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use std::path::{Path, PathBuf};

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const ENV_PREFIX: &str = "GATEKEEP_";

impl GatekeepConfig {
    /// Load the merged configuration for the repository at `root`.
    ///
    /// Priority, lowest first: embedded defaults, user config, repository
    /// config (or `custom` instead of both), `GATEKEEP_*` environment.
    pub fn load(root: &Path, custom: Option<&Path>) -> Result<Self> {
        let config: GatekeepConfig = Self::figment(root, custom)
            .extract()
            .context("Failed to load configuration")?;
        Ok(config)
    }

    pub fn figment(root: &Path, custom: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom {
            tracing::debug!("Using config file {}", custom_path.display());
            figment = figment.merge(smart_load::auto(custom_path));
        } else {
            if let Some(user) = user_config_dir() {
                figment = figment
                    .merge(Toml::file(user.join("config.toml")))
                    .merge(Json::file(user.join("config.json")))
                    .merge(Yaml::file(user.join("config.yaml")))
                    .merge(Yaml::file(user.join("config.yml")));
            }
            figment = figment
                .merge(Toml::file(root.join("gatekeep.toml")))
                .merge(Json::file(root.join("gatekeep.json")))
                .merge(Yaml::file(root.join("gatekeep.yaml")))
                .merge(Yaml::file(root.join("gatekeep.yml")));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// The embedded defaults, untouched by files or environment.
    pub fn defaults() -> Result<Self> {
        Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .extract()
            .context("Embedded default configuration is invalid")
    }
}

fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("gatekeep"))
}
