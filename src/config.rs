use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

fn default_swap_ceiling() -> u32 {
    2048
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Override for the per-application source tree root. Supports `~`.
    #[serde(default)]
    pub source_root: Option<String>,
    /// Override for the shared data root. Supports `~`.
    #[serde(default)]
    pub share_root: Option<String>,
    /// Upper bound in MB for temporary swap enlargement during large builds.
    #[serde(default = "default_swap_ceiling")]
    pub swap_ceiling_mb: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_root: None,
            share_root: None,
            swap_ceiling_mb: default_swap_ceiling(),
        }
    }
}

fn config_file_path() -> Result<PathBuf> {
    Ok(crate::common::paths::config_dir()?.join("shackup.toml"))
}

impl Config {
    /// Load the config from disk. If the config file does not exist,
    /// create a default config file and return the default.
    pub fn load() -> Result<Config> {
        let cfg_path = config_file_path()?;
        if !cfg_path.exists() {
            let default = Config::default();
            let toml = toml::to_string_pretty(&default).context("serializing default config")?;
            fs::write(&cfg_path, toml)
                .with_context(|| format!("writing default config to {}", cfg_path.display()))?;
            return Ok(default);
        }
        let s = fs::read_to_string(&cfg_path)
            .with_context(|| format!("reading config {}", cfg_path.display()))?;
        let c: Config = toml::from_str(&s).context("parsing config toml")?;
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let c: Config = toml::from_str("source_root = \"~/ham/src\"").unwrap();
        assert_eq!(c.source_root.as_deref(), Some("~/ham/src"));
        assert_eq!(c.swap_ceiling_mb, 2048);
    }

    #[test]
    fn default_round_trips() {
        let toml = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&toml).unwrap();
        assert_eq!(back.swap_ceiling_mb, default_swap_ceiling());
        assert!(back.source_root.is_none());
    }
}
