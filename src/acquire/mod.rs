//! Acquirer: fetch an application's source into its workspace.
//!
//! Each application gets exactly one workspace directory under the source
//! root. Git clones persist there between runs (the clone is the installed
//! source state); everything else is scratch. Whoever opens a workspace
//! gets a cleanup guard: unless the planner explicitly keeps it, the
//! directory is removed on drop, so failure paths and interrupts always
//! leave a clean slate for the next run.

use duct::cmd;
use git2::Repository;
use std::path::{Path, PathBuf};

use crate::catalog::{ApplicationSpec, SourceLocator};
use crate::cleanup::{self, CleanupGuard};
use crate::common::paths::Roots;
use crate::common::{git, http};
use crate::errors::UpdateError;
use crate::ui::prelude::*;
use crate::version::extract_token;

/// Per-application scratch/source directory with guaranteed cleanup.
pub struct Workspace {
    path: PathBuf,
    guard: Option<CleanupGuard>,
}

impl Workspace {
    pub fn open(roots: &Roots, id: &str) -> Result<Self, UpdateError> {
        let path = roots.source.join(id);
        std::fs::create_dir_all(&path)?;

        let cleanup_path = path.clone();
        let label = format!("remove workspace for {id}");
        let guard = cleanup::register(label, move || {
            let _ = std::fs::remove_dir_all(&cleanup_path);
        });

        Ok(Self {
            path,
            guard: Some(guard),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the directory: it is a persistent source tree (git clone) that
    /// future runs will sync instead of re-fetching.
    pub fn keep(mut self) {
        if let Some(guard) = self.guard.take() {
            guard.disarm();
        }
    }

    /// Remove the directory now (successful scratch use).
    pub fn remove(mut self) {
        if let Some(guard) = self.guard.take() {
            guard.run_now();
        }
    }
}

/// What a sync did to a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    New,
    Updated { from: String, to: String },
    Unchanged,
}

pub enum Artifact {
    SourceTree {
        dir: PathBuf,
        freshness: Freshness,
        version: Option<String>,
    },
    DebFile {
        path: PathBuf,
        version: Option<String>,
    },
    Package {
        name: &'static str,
    },
}

impl Artifact {
    pub fn version_guess(&self) -> Option<&str> {
        match self {
            Artifact::SourceTree { version, .. } | Artifact::DebFile { version, .. } => {
                version.as_deref()
            }
            Artifact::Package { .. } => None,
        }
    }

    pub fn freshness(&self) -> Option<&Freshness> {
        match self {
            Artifact::SourceTree { freshness, .. } => Some(freshness),
            _ => None,
        }
    }
}

pub async fn acquire(spec: &ApplicationSpec, ws: &Workspace) -> Result<Artifact, UpdateError> {
    match &spec.source {
        SourceLocator::Git { url } => acquire_git(spec, url, ws),
        SourceLocator::DownloadPage { page, link_pattern } => {
            acquire_download(spec, page, link_pattern, ws).await
        }
        SourceLocator::AptPackage { package } => Ok(Artifact::Package { name: package }),
        SourceLocator::None => Ok(Artifact::SourceTree {
            dir: ws.path().to_path_buf(),
            freshness: Freshness::New,
            version: None,
        }),
    }
}

fn acquire_git(spec: &ApplicationSpec, url: &str, ws: &Workspace) -> Result<Artifact, UpdateError> {
    let (repo, freshness) = if ws.path().join(".git").exists() {
        emit(
            Level::Info,
            "acquire.sync",
            &format!("[{}] syncing {url}", spec.id),
            None,
        );
        let mut repo = Repository::open(ws.path())?;
        let freshness = match git::sync_to_remote(&mut repo)
            .map_err(|e| UpdateError::Transient(format!("{e:#}")))?
        {
            git::SyncOutcome::Unchanged => Freshness::Unchanged,
            git::SyncOutcome::Updated { from, to } => Freshness::Updated { from, to },
        };
        (repo, freshness)
    } else {
        // A directory without .git is leftover from something that never
        // finished; clear it so the clone starts clean.
        clear_dir(ws.path())?;
        emit(
            Level::Info,
            "acquire.clone",
            &format!("[{}] cloning {url}", spec.id),
            None,
        );
        let repo = git::clone_repo(url, ws.path(), None)
            .map_err(|e| UpdateError::Transient(format!("{e:#}")))?;
        (repo, Freshness::New)
    };

    // Registered package versions for git builds carry the head hash.
    let version = git::head_short(&repo).ok().map(|h| format!("0+git{h}"));

    Ok(Artifact::SourceTree {
        dir: ws.path().to_path_buf(),
        freshness,
        version,
    })
}

async fn acquire_download(
    spec: &ApplicationSpec,
    page: &str,
    link_pattern: &str,
    ws: &Workspace,
) -> Result<Artifact, UpdateError> {
    let body = http::fetch_text(page).await?;
    let link = extract_token(link_pattern, &body).ok_or_else(|| UpdateError::ScrapeMismatch {
        url: page.to_string(),
        pattern: link_pattern.to_string(),
    })?;

    let url = resolve_link(page, &link);
    let file_name = link.rsplit('/').next().unwrap_or(&link).to_string();
    let dest = ws.path().join(&file_name);

    emit(
        Level::Info,
        "acquire.download",
        &format!("[{}] downloading {url}", spec.id),
        None,
    );
    http::download(&url, &dest).await?;

    let version = extract_token(r"([0-9]+(?:\.[0-9]+)+)", &file_name);

    if file_name.ends_with(".deb") {
        return Ok(Artifact::DebFile {
            path: dest,
            version,
        });
    }

    if is_tarball(&file_name) {
        extract_archive(&dest, ws.path())?;
    }

    Ok(Artifact::SourceTree {
        dir: ws.path().to_path_buf(),
        freshness: Freshness::New,
        version,
    })
}

fn is_tarball(name: &str) -> bool {
    [".tar.gz", ".tgz", ".tar.bz2", ".tar.xz"]
        .iter()
        .any(|ext| name.ends_with(ext))
}

/// Unpack into the workspace root. Upstream archives here all ship a single
/// top-level directory, which we strip.
fn extract_archive(archive: &Path, dir: &Path) -> Result<(), UpdateError> {
    cmd!(
        "tar",
        "xf",
        archive,
        "-C",
        dir,
        "--strip-components=1"
    )
    .run()
    .map_err(|e| UpdateError::Transient(format!("extracting {}: {e}", archive.display())))?;
    Ok(())
}

fn clear_dir(dir: &Path) -> Result<(), UpdateError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Resolve a scraped href against the page it came from.
fn resolve_link(page: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }

    if let Some(rest) = link.strip_prefix('/') {
        // Host-absolute: keep scheme://host only.
        if let Some(scheme_end) = page.find("://") {
            let after_scheme = &page[scheme_end + 3..];
            let host_end = after_scheme
                .find('/')
                .map(|i| scheme_end + 3 + i)
                .unwrap_or(page.len());
            return format!("{}/{}", &page[..host_end], rest);
        }
        return link.to_string();
    }

    // Page-relative: replace the page's last path segment.
    let base_end = page.rfind('/').map(|i| i + 1).unwrap_or(page.len());
    format!("{}{}", &page[..base_end], link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_links_pass_through() {
        assert_eq!(
            resolve_link(
                "https://wsjt.sourceforge.io/wsjtx.html",
                "https://example.com/wsjtx_2.7.0_armhf.deb"
            ),
            "https://example.com/wsjtx_2.7.0_armhf.deb"
        );
    }

    #[test]
    fn host_absolute_links_keep_the_host() {
        assert_eq!(
            resolve_link(
                "https://getpat.io/download/",
                "/releases/pat_0.16.0_linux_armhf.deb"
            ),
            "https://getpat.io/releases/pat_0.16.0_linux_armhf.deb"
        );
    }

    #[test]
    fn page_relative_links_replace_the_last_segment() {
        assert_eq!(
            resolve_link(
                "http://files.js8call.com/latest.html",
                "js8call_2.2.0_armhf.deb"
            ),
            "http://files.js8call.com/js8call_2.2.0_armhf.deb"
        );
        assert_eq!(
            resolve_link("http://www.w1hkj.com/files/fldigi/", "fldigi-4.2.05.tar.gz"),
            "http://www.w1hkj.com/files/fldigi/fldigi-4.2.05.tar.gz"
        );
    }

    #[test]
    fn tarball_detection() {
        assert!(is_tarball("fldigi-4.2.05.tar.gz"));
        assert!(is_tarball("ESPHamClock.tgz"));
        assert!(!is_tarball("wsjtx_2.7.0_armhf.deb"));
        assert!(!is_tarball("ardopc"));
    }
}
