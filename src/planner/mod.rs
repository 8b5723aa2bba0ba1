//! UpdatePlanner: the sequential control loop over the requested
//! applications.
//!
//! Per application: probe, decide {skip, install, reinstall}, acquire,
//! build, record the outcome. The first hard failure halts the whole run;
//! applications marked best-effort log and continue. Dependency batches are
//! memoized so a toolchain shared by several applications installs once.

use std::collections::HashSet;

use crate::acquire::{self, Artifact, Freshness, Workspace};
use crate::build;
use crate::catalog::{self, ApplicationSpec, VersionStrategy};
use crate::common::paths::Roots;
use crate::common::{apt, progress};
use crate::errors::{Stage, StageFailure, UpdateError};
use crate::self_update;
use crate::ui::prelude::*;
use crate::version;

/// One run's worth of input, produced either from the command line or from
/// the interactive picker. Ids are deduplicated case-insensitively with
/// order preserved; order matters because earlier applications may leave
/// state later ones rely on.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub apps: Vec<String>,
    pub force: bool,
    pub self_check: bool,
}

impl RunRequest {
    pub fn new(ids: impl IntoIterator<Item = String>, force: bool, self_check: bool) -> Self {
        let mut seen = HashSet::new();
        let mut apps = Vec::new();
        for id in ids {
            let id = id.trim().to_ascii_lowercase();
            if id.is_empty() {
                continue;
            }
            if seen.insert(id.clone()) {
                apps.push(id);
            }
        }
        Self {
            apps,
            force,
            self_check,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Skipped,
    UpToDate,
    Installed,
    Updated,
    Failed,
}

impl AppStatus {
    pub fn label(self) -> &'static str {
        match self {
            AppStatus::Skipped => "skipped",
            AppStatus::UpToDate => "up to date",
            AppStatus::Installed => "installed",
            AppStatus::Updated => "updated",
            AppStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub id: String,
    pub status: AppStatus,
    pub message: String,
}

/// Explicit per-run state threaded through every component call. Nothing
/// here is ambient; the catalog stays read-only and everything mutable
/// lives in this one place.
pub struct RunContext {
    pub force: bool,
    pub roots: Roots,
    pub swap_ceiling_mb: u32,
    /// Dependency packages already ensured this run.
    satisfied: HashSet<String>,
}

impl RunContext {
    pub fn new(roots: Roots, force: bool, swap_ceiling_mb: u32) -> Self {
        Self {
            force,
            roots,
            swap_ceiling_mb,
            satisfied: HashSet::new(),
        }
    }

    /// Ensure a set of system packages is present, installing the missing
    /// ones as a single apt batch. Memoized: packages ensured earlier in
    /// the run are not re-checked. A batch failure is fatal for the whole
    /// run and attributed to no single application.
    pub fn ensure_dependencies(&mut self, deps: &[&'static str]) -> Result<(), UpdateError> {
        let unseen: Vec<&'static str> = deps
            .iter()
            .filter(|d| !self.satisfied.contains(**d))
            .copied()
            .collect();
        if unseen.is_empty() {
            return Ok(());
        }

        let missing: Vec<&str> = unseen
            .iter()
            .filter(|d| apt::installed_version(d).is_none())
            .copied()
            .collect();

        if !missing.is_empty() {
            emit(
                Level::Info,
                "deps.install",
                &format!("installing {} build dependencies: {}", missing.len(), missing.join(" ")),
                None,
            );
            apt::install_batch(&missing)
                .map_err(|e| UpdateError::Dependencies(format!("{e:#}")))?;
        }

        for dep in unseen {
            self.satisfied.insert(dep.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<RunOutcome>,
    /// Why the run halted early, if it did.
    pub halted: Option<String>,
    /// The tool updated itself; nothing else was processed.
    pub self_updated: bool,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.halted.is_none()
    }
}

pub async fn run(
    catalog_entries: &[ApplicationSpec],
    request: &RunRequest,
    ctx: &mut RunContext,
) -> RunReport {
    let mut report = RunReport::default();

    // Self-update first: a successful one invalidates the running process,
    // so nothing else may be attempted afterwards.
    if request.self_check {
        emit(
            Level::Info,
            "self.check",
            "Checking shackup itself for updates...",
            None,
        );
        match self_update::check(&ctx.roots) {
            Ok(true) => {
                report.self_updated = true;
                emit(
                    Level::Success,
                    "self.updated",
                    "shackup was updated. Re-run it to continue with the new version.",
                    None,
                );
                return report;
            }
            Ok(false) => {
                emit(Level::Info, "self.current", "shackup is up to date.", None);
            }
            Err(e) => {
                failure_banner("shackup", "self-update", &e.to_string());
                report.halted = Some(format!("self-update failed: {e}"));
                return report;
            }
        }
    }

    for id in &request.apps {
        let Some(spec) = catalog::find(catalog_entries, id) else {
            emit(
                Level::Warn,
                "app.unknown",
                &format!("{id}: unknown application, skipping"),
                None,
            );
            report.outcomes.push(RunOutcome {
                id: id.clone(),
                status: AppStatus::Skipped,
                message: "unknown application".to_string(),
            });
            continue;
        };

        emit(
            Level::Info,
            "app.start",
            &format!("━━ {}: {}", spec.id, spec.description),
            None,
        );

        match process(spec, ctx).await {
            Ok((status, message)) => {
                let level = match status {
                    AppStatus::Skipped => Level::Info,
                    _ => Level::Success,
                };
                emit(
                    level,
                    "app.done",
                    &format!("{}: {} ({message})", spec.id, status.label()),
                    None,
                );
                report.outcomes.push(RunOutcome {
                    id: spec.id.to_string(),
                    status,
                    message,
                });
            }
            Err(failure) => {
                let reason = failure.to_string();
                report.outcomes.push(RunOutcome {
                    id: spec.id.to_string(),
                    status: AppStatus::Failed,
                    message: reason.clone(),
                });

                // Dependency batch failures are never attributable to one
                // application and always stop the run; otherwise only
                // best-effort applications may continue.
                let fatal =
                    matches!(failure.source, UpdateError::Dependencies(_)) || !spec.optional;
                if fatal {
                    failure_banner(spec.id, failure.stage.as_str(), &reason);
                    report.halted = Some(format!("{} failed during {}", spec.id, failure.stage));
                    return report;
                }
                emit(
                    Level::Warn,
                    "app.best_effort",
                    &format!(
                        "{}: failed during {} ({reason}); best-effort application, continuing",
                        spec.id, failure.stage
                    ),
                    None,
                );
            }
        }
    }

    report
}

async fn process(
    spec: &ApplicationSpec,
    ctx: &mut RunContext,
) -> Result<(AppStatus, String), StageFailure> {
    if matches!(spec.strategy, VersionStrategy::Manual) && !ctx.force {
        return Ok((
            AppStatus::Skipped,
            "not auto-checked; rerun with --force to reinstall".to_string(),
        ));
    }

    let mut probed_latest: Option<String> = None;
    let mut was_installed = false;

    if !ctx.force {
        match &spec.strategy {
            // Git freshness is decided by the fetch itself; AlwaysInstall
            // has no signal to consult.
            VersionStrategy::GitRepo | VersionStrategy::AlwaysInstall | VersionStrategy::Manual => {}
            _ => {
                let pb = progress::create_spinner(format!("checking {}...", spec.id));
                let probe = match version::probe(spec, &ctx.roots).await {
                    Ok(probe) => probe,
                    Err(e) => {
                        pb.finish_and_clear();
                        return Err(StageFailure::new(Stage::Probe, e));
                    }
                };

                if !probe.comparable {
                    pb.finish_and_clear();
                    return Err(StageFailure::new(
                        Stage::Probe,
                        UpdateError::Transient(format!(
                            "cannot determine freshness for {}; use --force to reinstall anyway",
                            spec.id
                        )),
                    ));
                }
                if probe.up_to_date() {
                    let v = probe.installed.clone().unwrap_or_default();
                    progress::finish_spinner_with_success(
                        pb,
                        format!("{} {v} is current", spec.id),
                    );
                    return Ok((AppStatus::UpToDate, format!("{v} is current")));
                }
                pb.finish_and_clear();
                was_installed = probe.installed.is_some();
                probed_latest = probe.latest;
            }
        }
    }

    let ws =
        Workspace::open(&ctx.roots, spec.id).map_err(|e| StageFailure::new(Stage::Fetch, e))?;
    let artifact = acquire::acquire(spec, &ws)
        .await
        .map_err(|e| StageFailure::new(Stage::Fetch, e))?;

    let is_git = matches!(spec.strategy, VersionStrategy::GitRepo);

    // An unchanged git tree means up to date; fetching was the check.
    if is_git
        && !ctx.force
        && matches!(artifact.freshness(), Some(Freshness::Unchanged))
    {
        ws.keep();
        return Ok((AppStatus::UpToDate, "already at origin head".to_string()));
    }

    let hint = version_hint(probed_latest.as_deref(), &artifact);
    // A build or install failure drops `ws`, which removes the workspace:
    // the failed tree never contaminates a future rebuild.
    build::build(spec, &artifact, ctx, &hint)?;

    let status = match artifact.freshness() {
        Some(Freshness::Updated { .. }) => AppStatus::Updated,
        _ if was_installed => AppStatus::Updated,
        _ => AppStatus::Installed,
    };
    let message = match artifact.freshness() {
        Some(Freshness::Updated { from, to }) => format!("{from} -> {to}"),
        _ => format!("version {hint}"),
    };

    if is_git {
        ws.keep();
    } else {
        ws.remove();
    }

    Ok((status, message))
}

/// Version string recorded at package registration: the probed latest when
/// we have one, else whatever the artifact itself reveals.
fn version_hint(latest: Option<&str>, artifact: &Artifact) -> String {
    latest
        .map(str::to_string)
        .or_else(|| artifact.version_guess().map(str::to_string))
        .unwrap_or_else(|| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{Cmd, InstallMethod, Recipe};
    use crate::catalog::{BinaryProbe, SourceLocator};
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn request_dedupes_case_insensitively_preserving_order() {
        let request = RunRequest::new(
            ["fldigi", "WSJTX", "Fldigi", " wsjtx ", "", "pat"]
                .into_iter()
                .map(String::from),
            false,
            false,
        );
        assert_eq!(request.apps, ["fldigi", "wsjtx", "pat"]);
    }

    #[test]
    fn version_hint_prefers_probed_latest() {
        let artifact = Artifact::DebFile {
            path: PathBuf::from("/tmp/x_1.0_armhf.deb"),
            version: Some("1.0".to_string()),
        };
        assert_eq!(version_hint(Some("2.0"), &artifact), "2.0");
        assert_eq!(version_hint(None, &artifact), "1.0");

        let bare = Artifact::Package { name: "xastir" };
        assert_eq!(version_hint(None, &bare), "0");
    }

    // ---- headless scenario tests over a synthetic catalog ----

    const SH_OK: Cmd = Cmd {
        program: "sh",
        args: &["-c", "true"],
    };
    const SH_FAIL: Cmd = Cmd {
        program: "sh",
        args: &["-c", "exit 1"],
    };

    const fn script_app(
        id: &'static str,
        build: &'static [Cmd],
        install: Cmd,
        optional: bool,
    ) -> ApplicationSpec {
        ApplicationSpec {
            id,
            description: "synthetic",
            strategy: VersionStrategy::AlwaysInstall,
            source: SourceLocator::None,
            recipe: Recipe {
                configure: &[],
                build,
                install: InstallMethod::Script(install),
                swap_mb: None,
                menu: None,
            },
            dependencies: &[],
            optional,
        }
    }

    static TEST_CATALOG: &[ApplicationSpec] = &[
        script_app("alpha", &[SH_OK], SH_OK, false),
        script_app("bad-build", &[SH_FAIL], SH_OK, false),
        script_app("bad-install", &[SH_OK], SH_FAIL, false),
        script_app("soft", &[SH_FAIL], SH_OK, true),
        script_app("omega", &[SH_OK], SH_OK, false),
        ApplicationSpec {
            id: "pinned",
            description: "synthetic pinned-version app",
            strategy: VersionStrategy::VersionFlag {
                probe: BinaryProbe {
                    binary: "echo",
                    args: &["test-tool 9.9"],
                    pattern: r"test-tool ([0-9.]+)",
                },
                latest: "9.9",
            },
            source: SourceLocator::None,
            recipe: Recipe {
                configure: &[],
                build: &[SH_OK],
                install: InstallMethod::Script(SH_OK),
                swap_mb: None,
                menu: None,
            },
            dependencies: &[],
            optional: false,
        },
        ApplicationSpec {
            id: "blob",
            description: "synthetic manual app",
            strategy: VersionStrategy::Manual,
            source: SourceLocator::None,
            recipe: Recipe {
                configure: &[],
                build: &[],
                install: InstallMethod::Script(SH_OK),
                swap_mb: None,
                menu: None,
            },
            dependencies: &[],
            optional: false,
        },
    ];

    fn test_ctx(tmp: &TempDir, force: bool) -> RunContext {
        let roots = Roots {
            source: tmp.path().join("src"),
            share: tmp.path().join("share"),
        };
        std::fs::create_dir_all(&roots.source).unwrap();
        std::fs::create_dir_all(&roots.share).unwrap();
        RunContext::new(roots, force, 2048)
    }

    async fn run_ids(tmp: &TempDir, ids: &[&str], force: bool) -> RunReport {
        let request = RunRequest::new(ids.iter().map(|s| s.to_string()), force, false);
        let mut ctx = test_ctx(tmp, force);
        run(TEST_CATALOG, &request, &mut ctx).await
    }

    #[tokio::test]
    #[serial]
    async fn fail_fast_halts_before_later_apps() {
        let tmp = TempDir::new().unwrap();
        let report = run_ids(&tmp, &["alpha", "bad-build", "omega"], false).await;

        assert!(report.halted.is_some());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].status, AppStatus::Installed);
        assert_eq!(report.outcomes[1].id, "bad-build");
        assert_eq!(report.outcomes[1].status, AppStatus::Failed);
    }

    #[tokio::test]
    #[serial]
    async fn install_failure_is_fatal_too() {
        let tmp = TempDir::new().unwrap();
        let report = run_ids(&tmp, &["bad-install", "omega"], false).await;

        assert!(report.halted.is_some());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].status, AppStatus::Failed);
    }

    #[tokio::test]
    #[serial]
    async fn best_effort_failure_continues_and_run_succeeds() {
        let tmp = TempDir::new().unwrap();
        let report = run_ids(&tmp, &["soft", "omega"], false).await;

        assert!(report.success());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].status, AppStatus::Failed);
        assert_eq!(report.outcomes[1].status, AppStatus::Installed);
    }

    #[tokio::test]
    #[serial]
    async fn unknown_app_is_skipped_without_affecting_the_rest() {
        let tmp = TempDir::new().unwrap();
        let report = run_ids(&tmp, &["alpha", "bogus-app"], false).await;

        assert!(report.success());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].status, AppStatus::Installed);
        assert_eq!(report.outcomes[1].status, AppStatus::Skipped);
        assert_eq!(report.outcomes[1].message, "unknown application");
    }

    #[tokio::test]
    #[serial]
    async fn workspace_is_gone_after_any_outcome() {
        let tmp = TempDir::new().unwrap();
        let report = run_ids(&tmp, &["alpha", "bad-build"], false).await;

        assert!(report.halted.is_some());
        // Scratch workspace cleaned on success...
        assert!(!tmp.path().join("src").join("alpha").exists());
        // ...and the failed tree removed so it cannot contaminate a rerun.
        assert!(!tmp.path().join("src").join("bad-build").exists());
    }

    #[tokio::test]
    #[serial]
    async fn manual_apps_only_run_under_force() {
        let tmp = TempDir::new().unwrap();
        let report = run_ids(&tmp, &["blob"], false).await;
        assert_eq!(report.outcomes[0].status, AppStatus::Skipped);

        let report = run_ids(&tmp, &["blob"], true).await;
        assert_eq!(report.outcomes[0].status, AppStatus::Installed);
    }

    #[tokio::test]
    #[serial]
    async fn pinned_version_match_is_up_to_date_unless_forced() {
        let tmp = TempDir::new().unwrap();
        let report = run_ids(&tmp, &["pinned"], false).await;
        assert!(report.success());
        assert_eq!(report.outcomes[0].status, AppStatus::UpToDate);

        // Force bypasses the oracle entirely.
        let report = run_ids(&tmp, &["pinned"], true).await;
        assert_eq!(report.outcomes[0].status, AppStatus::Installed);
    }
}
