//! Temporary swap enlargement for large builds on low-memory boards.
//!
//! Raspberry Pi OS manages swap through dphys-swapfile. Some builds need
//! more than the stock 100 MB to link; the guard enlarges the swap file and
//! restores the previous size on every exit path, including interrupts,
//! through the cleanup registry.

use anyhow::{Context, Result};
use duct::cmd;
use std::path::Path;

use crate::cleanup::{self, CleanupGuard};
use crate::ui::prelude::*;

const SWAP_CONFIG: &str = "/etc/dphys-swapfile";

/// Holds the restore action for an enlarged swap file. Dropping the guard
/// restores the original size; the cleanup registry does the same if the
/// process is interrupted first.
pub struct SwapGuard {
    _restore: CleanupGuard,
}

/// Enlarge swap to at least `target_mb`, bounded by `ceiling_mb`.
///
/// Returns `Ok(None)` when no change is needed: swap is already large
/// enough, or this host does not use dphys-swapfile at all.
pub fn enlarge(target_mb: u32, ceiling_mb: u32) -> Result<Option<SwapGuard>> {
    let target_mb = target_mb.min(ceiling_mb);

    let Some(current_mb) = current_size_mb()? else {
        emit(
            Level::Debug,
            "swap.skip",
            "no dphys-swapfile on this host, leaving swap alone",
            None,
        );
        return Ok(None);
    };

    if current_mb >= target_mb {
        return Ok(None);
    }

    emit(
        Level::Info,
        "swap.grow",
        &format!("enlarging swap {current_mb} MB -> {target_mb} MB for this build"),
        None,
    );
    apply_size(target_mb)?;

    let restore = cleanup::register(format!("restore swap to {current_mb} MB"), move || {
        emit(
            Level::Info,
            "swap.restore",
            &format!("restoring swap to {current_mb} MB"),
            None,
        );
        if let Err(e) = apply_size(current_mb) {
            emit(
                Level::Warn,
                "swap.restore.failed",
                &format!("could not restore swap size: {e:#}"),
                None,
            );
        }
    });

    Ok(Some(SwapGuard { _restore: restore }))
}

fn current_size_mb() -> Result<Option<u32>> {
    if !Path::new(SWAP_CONFIG).exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(SWAP_CONFIG)
        .with_context(|| format!("reading {SWAP_CONFIG}"))?;
    Ok(parse_swap_size(&contents))
}

fn parse_swap_size(contents: &str) -> Option<u32> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| line.strip_prefix("CONF_SWAPSIZE="))
        .and_then(|value| value.trim().parse().ok())
}

fn apply_size(mb: u32) -> Result<()> {
    cmd!(
        "sudo",
        "sed",
        "-i",
        format!("s/^CONF_SWAPSIZE=.*/CONF_SWAPSIZE={mb}/"),
        SWAP_CONFIG
    )
    .run()
    .context("Failed to edit dphys-swapfile config")?;

    cmd!("sudo", "systemctl", "restart", "dphys-swapfile")
        .run()
        .context("Failed to restart dphys-swapfile")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stock_config() {
        let contents = "\
# some comment
CONF_SWAPSIZE=100
CONF_MAXSWAP=2048
";
        assert_eq!(parse_swap_size(contents), Some(100));
    }

    #[test]
    fn ignores_commented_size() {
        let contents = "#CONF_SWAPSIZE=100\n";
        assert_eq!(parse_swap_size(contents), None);
    }

    #[test]
    fn empty_config_has_no_size() {
        assert_eq!(parse_swap_size(""), None);
    }
}
