use anyhow::{Context, Result};
use git2::{
    FetchOptions, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use std::path::Path;

/// What a sync against the remote actually did. Fetching IS the update for
/// repository-based applications, so this doubles as their freshness answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated { from: String, to: String },
    Unchanged,
}

/// Clone a repository with optional depth
pub fn clone_repo(url: &str, target: &Path, depth: Option<i32>) -> Result<Repository> {
    let mut fetch_options = FetchOptions::new();

    if let Some(depth) = depth {
        fetch_options.depth(depth);
    }

    fetch_options.remote_callbacks(git2::RemoteCallbacks::new());

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    let repo = builder
        .clone(url, target)
        .with_context(|| format!("Failed to clone {url}"))?;

    Ok(repo)
}

/// Get the current checked out branch name
pub fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.head().context("Failed to get HEAD reference")?;

    let head_name = head
        .shorthand()
        .ok_or_else(|| anyhow::anyhow!("HEAD is detached"))?;

    Ok(head_name.to_string())
}

/// Short hash of the current HEAD commit
pub fn head_short(repo: &Repository) -> Result<String> {
    let commit = repo
        .head()
        .context("Failed to get HEAD reference")?
        .peel_to_commit()
        .context("Failed to peel HEAD to commit")?;
    let id = commit.id().to_string();
    Ok(id.chars().take(8).collect())
}

fn fetch_branch(repo: &Repository, branch: &str) -> Result<()> {
    let mut remote = repo
        .find_remote("origin")
        .context("Failed to find origin remote")?;

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(git2::RemoteCallbacks::new());

    remote
        .fetch(&[branch], Some(&mut fetch_options), None)
        .context("Failed to fetch branch")?;

    Ok(())
}

/// Discard local state and move the working tree to the remote head.
///
/// The unconditional hard reset before the fetch is intentional: it throws
/// away any local modification, including partial build artifacts left by a
/// previously interrupted run, so the fetch can never fail on divergence.
pub fn sync_to_remote(repo: &mut Repository) -> Result<SyncOutcome> {
    let branch_name = current_branch(repo)?;

    if !repo.statuses(None)?.is_empty() {
        repo.reset_default(None, None::<&str>)?;
        repo.checkout_head(Some(
            &mut CheckoutBuilder::new()
                .force()
                .remove_ignored(true)
                .remove_untracked(true),
        ))?;
    }

    fetch_branch(repo, &branch_name)?;

    let local_commit = repo
        .head()
        .context("Failed to get HEAD reference")?
        .peel_to_commit()
        .context("Failed to peel HEAD to commit")?
        .id();

    let remote_branch_name = format!("origin/{branch_name}");
    let remote_commit = repo
        .find_reference(&remote_branch_name)
        .context("Failed to find remote branch reference")?
        .peel_to_commit()
        .context("Failed to peel remote branch to commit")?;

    if remote_commit.id() == local_commit {
        return Ok(SyncOutcome::Unchanged);
    }

    let from: String = local_commit.to_string().chars().take(8).collect();
    let to: String = remote_commit.id().to_string().chars().take(8).collect();

    repo.set_head(&format!("refs/heads/{branch_name}"))
        .context("Failed to set HEAD")?;

    repo.reset(
        &remote_commit.into_object(),
        git2::ResetType::Hard,
        None,
    )
    .context("Failed to reset to remote commit")?;

    Ok(SyncOutcome::Updated { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_origin(dir: &Path) {
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(dir)
                .env("GIT_AUTHOR_NAME", "t")
                .env("GIT_AUTHOR_EMAIL", "t@t")
                .env("GIT_COMMITTER_NAME", "t")
                .env("GIT_COMMITTER_EMAIL", "t@t")
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        run(&["init", "-b", "main", "."]);
        std::fs::write(dir.join("README"), "hello").unwrap();
        run(&["add", "."]);
        run(&["commit", "-m", "init"]);
    }

    #[test]
    fn clone_then_sync_is_unchanged() {
        let origin = TempDir::new().unwrap();
        init_origin(origin.path());

        let clone_dir = TempDir::new().unwrap();
        let target = clone_dir.path().join("clone");
        let url = format!("file://{}", origin.path().display());
        let mut repo = clone_repo(&url, &target, None).unwrap();

        assert_eq!(sync_to_remote(&mut repo).unwrap(), SyncOutcome::Unchanged);
    }

    #[test]
    fn sync_applies_new_upstream_commit() {
        let origin = TempDir::new().unwrap();
        init_origin(origin.path());

        let clone_dir = TempDir::new().unwrap();
        let target = clone_dir.path().join("clone");
        let url = format!("file://{}", origin.path().display());
        let mut repo = clone_repo(&url, &target, None).unwrap();

        std::fs::write(origin.path().join("README"), "changed").unwrap();
        let status = Command::new("git")
            .args(["commit", "-am", "update"])
            .current_dir(origin.path())
            .env("GIT_AUTHOR_NAME", "t")
            .env("GIT_AUTHOR_EMAIL", "t@t")
            .env("GIT_COMMITTER_NAME", "t")
            .env("GIT_COMMITTER_EMAIL", "t@t")
            .status()
            .unwrap();
        assert!(status.success());

        match sync_to_remote(&mut repo).unwrap() {
            SyncOutcome::Updated { from, to } => {
                assert_ne!(from, to);
                assert_eq!(std::fs::read_to_string(target.join("README")).unwrap(), "changed");
            }
            other => panic!("expected Updated, got {other:?}"),
        }
    }

    #[test]
    fn sync_discards_local_modifications() {
        let origin = TempDir::new().unwrap();
        init_origin(origin.path());

        let clone_dir = TempDir::new().unwrap();
        let target = clone_dir.path().join("clone");
        let url = format!("file://{}", origin.path().display());
        let mut repo = clone_repo(&url, &target, None).unwrap();

        // Simulate a partial build artifact in the working tree.
        std::fs::write(target.join("README"), "dirty").unwrap();

        assert_eq!(sync_to_remote(&mut repo).unwrap(), SyncOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(target.join("README")).unwrap(), "hello");
    }
}
