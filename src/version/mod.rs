//! VersionOracle: decide installed and latest-available versions for one
//! application using its catalog strategy.
//!
//! Comparison is plain string equality everywhere except the git strategy.
//! Upstream version formats are too inconsistent for ordering to be worth
//! the fragility; a formatting drift costs one redundant (idempotent)
//! reinstall, which is the cheap side of that trade.

use duct::cmd;
use git2::Repository;
use regex::Regex;

use crate::catalog::{ApplicationSpec, BinaryProbe, InstalledProbe, VersionStrategy};
use crate::common::paths::Roots;
use crate::common::{apt, git, http};
use crate::errors::UpdateError;

/// Produced fresh on every decision; never cached across applications or
/// runs. Absence of `installed` means "not installed". `comparable=false`
/// means the strategy could not determine freshness at all.
#[derive(Debug, Clone, Default)]
pub struct VersionProbe {
    pub installed: Option<String>,
    pub latest: Option<String>,
    pub comparable: bool,
}

impl VersionProbe {
    pub fn up_to_date(&self) -> bool {
        self.comparable && self.installed.is_some() && self.installed == self.latest
    }
}

pub async fn probe(spec: &ApplicationSpec, roots: &Roots) -> Result<VersionProbe, UpdateError> {
    match &spec.strategy {
        VersionStrategy::PackageManager { package } => {
            let installed = apt::installed_version(package);
            let latest = apt::candidate_version(package)?;
            let comparable = latest.is_some();
            Ok(VersionProbe {
                installed,
                latest,
                comparable,
            })
        }
        VersionStrategy::GitRepo => {
            // Freshness for git applications is decided by the fetch itself
            // (check and apply are one step); this probe only reports
            // whether a clone exists and where its head sits.
            let clone = roots.source.join(spec.id);
            let installed = if clone.join(".git").exists() {
                let repo = Repository::open(&clone)?;
                git::head_short(&repo).ok()
            } else {
                None
            };
            Ok(VersionProbe {
                installed,
                latest: None,
                comparable: false,
            })
        }
        VersionStrategy::ScrapedPage {
            url,
            pattern,
            installed,
        } => {
            let latest = latest_from_page(url, pattern).await?;
            let installed = match installed {
                InstalledProbe::Package(package) => apt::installed_version(package),
                InstalledProbe::Binary(probe) => binary_version(probe),
            };
            Ok(VersionProbe {
                installed,
                latest: Some(latest),
                comparable: true,
            })
        }
        VersionStrategy::VersionFlag { probe, latest } => Ok(VersionProbe {
            installed: binary_version(probe),
            latest: Some((*latest).to_string()),
            comparable: true,
        }),
        VersionStrategy::AlwaysInstall | VersionStrategy::Manual => Ok(VersionProbe::default()),
    }
}

/// Scrape the latest version token from a download page. A pattern miss is
/// an error, not "up to date": it almost always means the upstream page
/// layout changed and the catalog pattern needs attention.
pub async fn latest_from_page(url: &str, pattern: &str) -> Result<String, UpdateError> {
    let body = http::fetch_text(url).await?;
    extract_token(pattern, &body).ok_or_else(|| UpdateError::ScrapeMismatch {
        url: url.to_string(),
        pattern: pattern.to_string(),
    })
}

/// First capture group of `pattern` in `text`.
pub fn extract_token(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).expect("invalid catalog pattern");
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Version reported by the installed binary itself, or `None` when the
/// binary is absent or its output does not match.
fn binary_version(probe: &BinaryProbe) -> Option<String> {
    which::which(probe.binary).ok()?;
    let output = cmd(probe.binary, probe.args)
        .stderr_to_stdout()
        .unchecked()
        .read()
        .ok()?;
    extract_token(probe.pattern, &output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_version_from_listing_html() {
        let html = r#"
            <tr><td><a href="fldigi-4.2.05.tar.gz">fldigi-4.2.05.tar.gz</a></td></tr>
            <tr><td><a href="fldigi-4.2.05.tar.gz.sig">sig</a></td></tr>
        "#;
        assert_eq!(
            extract_token(r"fldigi-([0-9][0-9.]*)\.tar\.gz", html),
            Some("4.2.05".to_string())
        );
    }

    #[test]
    fn missing_token_is_none() {
        assert_eq!(
            extract_token(r"fldigi-([0-9][0-9.]*)\.tar\.gz", "<html>moved</html>"),
            None
        );
    }

    #[test]
    fn extracts_version_from_flag_output() {
        let out = "fldigi 4.2.03\nCopyright (C) ...";
        assert_eq!(
            extract_token(r"fldigi\s+([0-9][0-9.]*)", out),
            Some("4.2.03".to_string())
        );
    }

    #[test]
    fn up_to_date_requires_matching_strings() {
        let probe = VersionProbe {
            installed: Some("1.2.3".into()),
            latest: Some("1.2.3".into()),
            comparable: true,
        };
        assert!(probe.up_to_date());

        let drifted = VersionProbe {
            installed: Some("1.2.3-1".into()),
            latest: Some("1.2.3".into()),
            comparable: true,
        };
        assert!(!drifted.up_to_date());
    }

    #[test]
    fn not_installed_is_never_up_to_date() {
        let probe = VersionProbe {
            installed: None,
            latest: Some("1.0".into()),
            comparable: true,
        };
        assert!(!probe.up_to_date());
    }

    #[test]
    fn incomparable_is_never_up_to_date() {
        let probe = VersionProbe {
            installed: Some("1.0".into()),
            latest: Some("1.0".into()),
            comparable: false,
        };
        assert!(!probe.up_to_date());
    }
}
