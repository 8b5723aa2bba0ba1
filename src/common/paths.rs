use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;

/// Centralized path management for shackup.
/// All filesystem roots used by the tool are resolved here, once per run.

/// Get the shackup config directory
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("shackup");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default root for per-application source trees
pub fn default_source_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("shackup")
        .join("src")
}

/// Default root for shared installed assets (icons, data files, the tool's
/// own distribution clone)
pub fn default_share_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("shackup")
        .join("share")
}

/// Filesystem roots for one run, resolved from the config with `~`
/// expansion applied.
#[derive(Debug, Clone)]
pub struct Roots {
    /// Per-application source/workspace trees live under here.
    pub source: PathBuf,
    /// Shared data root for auxiliary installed assets.
    pub share: PathBuf,
}

impl Roots {
    pub fn resolve(config: &Config) -> Result<Self> {
        let source = match &config.source_root {
            Some(raw) => PathBuf::from(
                shellexpand::tilde(raw.as_str()).into_owned(),
            ),
            None => default_source_root(),
        };
        let share = match &config.share_root {
            Some(raw) => PathBuf::from(
                shellexpand::tilde(raw.as_str()).into_owned(),
            ),
            None => default_share_root(),
        };

        std::fs::create_dir_all(&source)
            .with_context(|| format!("creating source root at {}", source.display()))?;
        std::fs::create_dir_all(&share)
            .with_context(|| format!("creating share root at {}", share.display()))?;

        Ok(Self { source, share })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roots_are_distinct() {
        assert_ne!(default_source_root(), default_share_root());
    }
}
