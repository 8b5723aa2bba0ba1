//! SelfUpdater: the git strategy applied to shackup's own distribution
//! repository.
//!
//! Runs before anything else in a run. When the sync applies changes, the
//! running process is stale relative to the files on disk, so the run stops
//! and the operator re-invokes the tool.

use git2::Repository;

use crate::common::git;
use crate::common::paths::Roots;
use crate::errors::UpdateError;
use crate::ui::prelude::*;

const DIST_REPO_URL: &str = "https://github.com/shackup/shackup.git";

/// Sync the distribution clone. Returns `true` when an update was applied
/// and the current process must not continue.
pub fn check(roots: &Roots) -> Result<bool, UpdateError> {
    let clone = roots.share.join("shackup");

    if !clone.join(".git").exists() {
        if clone.exists() {
            std::fs::remove_dir_all(&clone)?;
        }
        git::clone_repo(DIST_REPO_URL, &clone, None)
            .map_err(|e| UpdateError::Transient(format!("{e:#}")))?;
        // A fresh clone is the baseline, not an update; the running binary
        // already matches it.
        emit(
            Level::Info,
            "self.init",
            "distribution clone initialized; future runs will track it",
            None,
        );
        return Ok(false);
    }

    let mut repo = Repository::open(&clone)?;
    match git::sync_to_remote(&mut repo)
        .map_err(|e| UpdateError::Transient(format!("{e:#}")))?
    {
        git::SyncOutcome::Updated { from, to } => {
            emit(
                Level::Info,
                "self.pulled",
                &format!("distribution repository advanced {from} -> {to}"),
                None,
            );
            Ok(true)
        }
        git::SyncOutcome::Unchanged => Ok(false),
    }
}
