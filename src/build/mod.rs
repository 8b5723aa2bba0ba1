//! Builder/Installer: turns a fetched artifact into an installed, registered
//! application.
//!
//! The pipeline per application is a fixed stage order: dependencies,
//! configure, build, install/register, desktop integration. A failure in any
//! stage carries that stage name out to the failure banner. Desktop
//! integration is the one stage that never fails the install.

use duct::cmd;
use std::path::{Path, PathBuf};

use crate::acquire::Artifact;
use crate::catalog::ApplicationSpec;
use crate::common::desktop::MenuTweak;
use crate::common::{apt, desktop, swap};
use crate::errors::{Stage, StageFailure, StageResult, UpdateError};
use crate::planner::RunContext;
use crate::ui::prelude::*;

/// One build command, run inside the source tree with output streamed
/// through to the operator.
pub struct Cmd {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl Cmd {
    fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.to_string()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn run_in(&self, dir: &Path) -> Result<(), UpdateError> {
        cmd(self.program, self.args)
            .dir(dir)
            .run()
            .map_err(|_| UpdateError::BuildStep {
                step: self.display(),
            })?;
        Ok(())
    }
}

/// Application-specific build procedure, treated as data by the planner.
pub struct Recipe {
    pub configure: &'static [Cmd],
    pub build: &'static [Cmd],
    pub install: InstallMethod,
    /// Minimum swap in MB this build needs; enlarged temporarily and
    /// restored on every exit path.
    pub swap_mb: Option<u32>,
    pub menu: Option<MenuTweak>,
}

pub enum InstallMethod {
    /// `make install` under checkinstall, so the result is a dpkg package.
    CheckInstall {
        pkgname: &'static str,
        /// Build directory relative to the source tree (cmake out-of-tree
        /// builds), when not the tree root.
        subdir: Option<&'static str>,
    },
    /// The artifact is a .deb; install it through apt.
    Deb,
    /// The application comes straight from the archives.
    Apt { package: &'static str },
    /// Escape hatch for upstreams with no packaging support.
    Script(Cmd),
}

pub fn build(
    spec: &ApplicationSpec,
    artifact: &Artifact,
    ctx: &mut RunContext,
    version_hint: &str,
) -> StageResult<()> {
    // DependenciesSatisfied: one apt batch, memoized across the run.
    ctx.ensure_dependencies(spec.dependencies)
        .map_err(|e| StageFailure::new(Stage::Dependencies, e))?;

    let recipe = &spec.recipe;

    // Large compiles on a Pi need more swap than the stock image carries.
    // The guard restores the previous size when this function returns,
    // successfully or not; the cleanup registry covers interrupts.
    let _swap = match recipe.swap_mb {
        Some(mb) => swap::enlarge(mb, ctx.swap_ceiling_mb)
            .map_err(|e| StageFailure::new(Stage::Dependencies, UpdateError::Transient(format!("{e:#}"))))?,
        None => None,
    };

    let tree = build_dir(artifact);

    for step in recipe.configure {
        emit(
            Level::Info,
            "build.configure",
            &format!("[{}] {}", spec.id, step.display()),
            None,
        );
        step.run_in(&tree)
            .map_err(|e| StageFailure::new(Stage::Configure, e))?;
    }

    for step in recipe.build {
        emit(
            Level::Info,
            "build.compile",
            &format!("[{}] {}", spec.id, step.display()),
            None,
        );
        step.run_in(&tree)
            .map_err(|e| StageFailure::new(Stage::Build, e))?;
    }

    install(spec, artifact, &tree, version_hint)
        .map_err(|e| StageFailure::new(Stage::Install, e))?;

    // DesktopIntegrated: soft by design. A broken menu entry is an
    // annoyance; a failed install is not.
    if let Some(tweak) = &recipe.menu {
        if let Err(e) = desktop::apply(tweak) {
            emit(
                Level::Warn,
                "build.desktop",
                &format!("[{}] {} failed: {e:#}", spec.id, Stage::Desktop),
                None,
            );
        }
    }

    Ok(())
}

fn build_dir(artifact: &Artifact) -> PathBuf {
    match artifact {
        Artifact::SourceTree { dir, .. } => dir.clone(),
        Artifact::DebFile { path, .. } => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        Artifact::Package { .. } => PathBuf::from("."),
    }
}

fn install(
    spec: &ApplicationSpec,
    artifact: &Artifact,
    tree: &Path,
    version_hint: &str,
) -> Result<(), UpdateError> {
    match &spec.recipe.install {
        InstallMethod::CheckInstall { pkgname, subdir } => {
            let dir = match subdir {
                Some(sub) => tree.join(sub),
                None => tree.to_path_buf(),
            };
            apt::register_build(&dir, pkgname, version_hint).map_err(|e| {
                UpdateError::Registration {
                    reason: format!("{e:#}"),
                }
            })
        }
        InstallMethod::Deb => {
            let Artifact::DebFile { path, .. } = artifact else {
                return Err(UpdateError::Registration {
                    reason: format!("{} expected a .deb artifact", spec.id),
                });
            };
            apt::install_deb(path).map_err(|e| UpdateError::Registration {
                reason: format!("{e:#}"),
            })
        }
        InstallMethod::Apt { package } => {
            apt::install_batch(&[*package]).map_err(|e| UpdateError::Registration {
                reason: format!("{e:#}"),
            })
        }
        InstallMethod::Script(step) => {
            emit(
                Level::Info,
                "build.install",
                &format!("[{}] {}", spec.id, step.display()),
                None,
            );
            step.run_in(tree).map_err(|_| UpdateError::Registration {
                reason: format!("install step `{}` failed", step.display()),
            })
        }
    }
}
