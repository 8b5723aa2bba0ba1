//! apt/dpkg wrapper: installed-version queries, candidate lookups, batch
//! installs, and registration of locally built trees with the package
//! database via checkinstall.

use anyhow::{Context, Result};
use duct::cmd;
use std::path::Path;

use crate::errors::UpdateError;

/// Installed version string from the dpkg database, or `None` when the
/// package is not in state `installed`.
pub fn installed_version(package: &str) -> Option<String> {
    let out = cmd!(
        "dpkg-query",
        "--showformat=${db:Status-Status} ${Version}",
        "--show",
        package
    )
    .stderr_null()
    .read()
    .ok()?;
    parse_dpkg_status(&out)
}

fn parse_dpkg_status(out: &str) -> Option<String> {
    let mut parts = out.trim().splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some("installed"), Some(version)) if !version.is_empty() => Some(version.to_string()),
        _ => None,
    }
}

/// Candidate version from `apt-cache policy`. `Ok(None)` means apt knows the
/// package but has no candidate; the caller decides how conservative to be.
pub fn candidate_version(package: &str) -> Result<Option<String>, UpdateError> {
    let out = cmd!("apt-cache", "policy", package)
        .stderr_null()
        .read()
        .map_err(|e| UpdateError::Transient(format!("apt-cache policy {package}: {e}")))?;
    Ok(parse_policy_candidate(&out))
}

fn parse_policy_candidate(out: &str) -> Option<String> {
    for line in out.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Candidate:") {
            let candidate = rest.trim();
            if candidate.is_empty() || candidate == "(none)" {
                return None;
            }
            return Some(candidate.to_string());
        }
    }
    None
}

/// Install a batch of packages with a single apt invocation.
pub fn install_batch(packages: &[&str]) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }

    let mut args: Vec<&str> = vec!["apt-get", "install", "-y"];
    args.extend(packages);

    cmd("sudo", &args)
        .run()
        .context("Failed to install packages with apt")?;

    Ok(())
}

/// Install a downloaded .deb file through apt so its dependencies resolve.
pub fn install_deb(path: &Path) -> Result<()> {
    let path_str = path
        .to_str()
        .context("non-UTF-8 path to .deb file")?
        .to_string();

    cmd!("sudo", "apt-get", "install", "-y", &path_str)
        .run()
        .with_context(|| format!("Failed to install {}", path.display()))?;

    Ok(())
}

/// Register a built source tree with dpkg via checkinstall. This runs the
/// tree's `make install` under checkinstall so the result is a real package:
/// later freshness probes see it and it can be removed cleanly.
pub fn register_build(dir: &Path, pkgname: &str, version: &str) -> Result<()> {
    cmd!(
        "sudo",
        "checkinstall",
        "-y",
        "--nodoc",
        "--backup=no",
        format!("--pkgname={pkgname}"),
        format!("--pkgversion={version}")
    )
    .dir(dir)
    .run()
    .with_context(|| format!("checkinstall failed for {pkgname}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpkg_status_installed() {
        assert_eq!(
            parse_dpkg_status("installed 1.4.3-1"),
            Some("1.4.3-1".to_string())
        );
    }

    #[test]
    fn dpkg_status_removed_but_configured() {
        assert_eq!(parse_dpkg_status("config-files 1.4.3-1"), None);
        assert_eq!(parse_dpkg_status("not-installed "), None);
        assert_eq!(parse_dpkg_status(""), None);
    }

    #[test]
    fn policy_candidate_present() {
        let out = "\
wsjtx:
  Installed: 2.6.1+repack-3
  Candidate: 2.7.0-1
  Version table:
";
        assert_eq!(
            parse_policy_candidate(out),
            Some("2.7.0-1".to_string())
        );
    }

    #[test]
    fn policy_candidate_none() {
        let out = "\
bogus:
  Installed: (none)
  Candidate: (none)
";
        assert_eq!(parse_policy_candidate(out), None);
        assert_eq!(parse_policy_candidate(""), None);
    }
}
