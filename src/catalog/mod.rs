//! The application catalog.
//!
//! Every supported application is one static [`ApplicationSpec`]: how to
//! decide freshness, where the source lives, and the recipe that turns the
//! fetched source into an installed application. Adding an application is
//! adding an entry here, not adding a code branch.

mod apps;

use crate::build::Recipe;
use crate::common::apt;

pub use apps::CATALOG;

/// Static descriptor for one installable application. Immutable for the
/// duration of a run.
pub struct ApplicationSpec {
    /// Unique slug, stable, used in all lookups.
    pub id: &'static str,
    pub description: &'static str,
    pub strategy: VersionStrategy,
    pub source: SourceLocator,
    pub recipe: Recipe,
    /// System packages required before building, installed as one batch.
    pub dependencies: &'static [&'static str],
    /// Best-effort applications: a failure is recorded but does not halt
    /// the run.
    pub optional: bool,
}

/// How "installed version" and "latest version" are determined.
pub enum VersionStrategy {
    /// dpkg installed string vs apt candidate string.
    PackageManager { package: &'static str },
    /// Local clone state vs origin head. Fetching is the update; the check
    /// and the apply are one step for these applications.
    GitRepo,
    /// Latest scraped from a download page; installed read locally.
    ScrapedPage {
        url: &'static str,
        /// Regex with the version token in capture group 1.
        pattern: &'static str,
        installed: InstalledProbe,
    },
    /// Installed binary reports its version; latest is pinned in the
    /// catalog and updated together with the tool.
    VersionFlag {
        probe: BinaryProbe,
        latest: &'static str,
    },
    /// No usable freshness signal; reinstalled whenever requested.
    AlwaysInstall,
    /// Never auto-checked; only processed under --force.
    Manual,
}

/// Run an installed binary and regex-extract its version from the output.
pub struct BinaryProbe {
    pub binary: &'static str,
    pub args: &'static [&'static str],
    /// Version token in capture group 1.
    pub pattern: &'static str,
}

/// Where the installed side of a scraped comparison comes from.
pub enum InstalledProbe {
    Package(&'static str),
    Binary(BinaryProbe),
}

/// Strategy-specific source location.
pub enum SourceLocator {
    Git { url: &'static str },
    /// A download page that must be scraped for the concrete file link.
    DownloadPage {
        page: &'static str,
        /// Regex with the href (absolute or page-relative) in capture
        /// group 1.
        link_pattern: &'static str,
    },
    AptPackage { package: &'static str },
    /// Nothing to fetch; the recipe does all the work.
    None,
}

impl VersionStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            VersionStrategy::PackageManager { .. } => "apt",
            VersionStrategy::GitRepo => "git",
            VersionStrategy::ScrapedPage { .. } => "download page",
            VersionStrategy::VersionFlag { .. } => "version flag",
            VersionStrategy::AlwaysInstall => "always",
            VersionStrategy::Manual => "manual",
        }
    }
}

impl ApplicationSpec {
    /// Quick local-only installed check for catalog listings. Never touches
    /// the network.
    pub fn installed_locally(&self, source_root: &std::path::Path) -> bool {
        match &self.strategy {
            VersionStrategy::PackageManager { package } => {
                apt::installed_version(package).is_some()
            }
            VersionStrategy::GitRepo => source_root.join(self.id).join(".git").exists(),
            VersionStrategy::ScrapedPage { installed, .. } => match installed {
                InstalledProbe::Package(package) => apt::installed_version(package).is_some(),
                InstalledProbe::Binary(probe) => which::which(probe.binary).is_ok(),
            },
            VersionStrategy::VersionFlag { probe, .. } => which::which(probe.binary).is_ok(),
            VersionStrategy::AlwaysInstall | VersionStrategy::Manual => false,
        }
    }
}

/// Look up an application by id, case-insensitively.
pub fn find<'a>(catalog: &'a [ApplicationSpec], id: &str) -> Option<&'a ApplicationSpec> {
    catalog.iter().find(|spec| spec.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn ids_are_unique_and_lowercase() {
        let mut seen = std::collections::HashSet::new();
        for spec in CATALOG {
            assert!(seen.insert(spec.id), "duplicate id {}", spec.id);
            assert_eq!(spec.id, spec.id.to_ascii_lowercase());
        }
    }

    #[test]
    fn find_is_case_insensitive() {
        assert!(find(CATALOG, "FLDIGI").is_some());
        assert!(find(CATALOG, "fldigi").is_some());
        assert!(find(CATALOG, "bogus-app").is_none());
    }

    #[test]
    fn catalog_patterns_compile() {
        for spec in CATALOG {
            match &spec.strategy {
                VersionStrategy::ScrapedPage { pattern, installed, .. } => {
                    let re = Regex::new(pattern).expect("scrape pattern");
                    assert!(re.captures_len() >= 2, "{}: pattern needs a capture group", spec.id);
                    if let InstalledProbe::Binary(probe) = installed {
                        Regex::new(probe.pattern).expect("binary pattern");
                    }
                }
                VersionStrategy::VersionFlag { probe, .. } => {
                    Regex::new(probe.pattern).expect("binary pattern");
                }
                _ => {}
            }
            if let SourceLocator::DownloadPage { link_pattern, .. } = &spec.source {
                let re = Regex::new(link_pattern).expect("link pattern");
                assert!(re.captures_len() >= 2, "{}: link pattern needs a capture group", spec.id);
            }
        }
    }

    #[test]
    fn git_apps_have_git_sources() {
        for spec in CATALOG {
            if matches!(spec.strategy, VersionStrategy::GitRepo) {
                assert!(
                    matches!(spec.source, SourceLocator::Git { .. }),
                    "{} uses the git strategy but has no git source",
                    spec.id
                );
            }
        }
    }
}
