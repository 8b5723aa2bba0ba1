use thiserror::Error;

/// Pipeline stages, used for failure attribution in outcomes and banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Probe,
    Fetch,
    Dependencies,
    Configure,
    Build,
    Install,
    Desktop,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Probe => "version probe",
            Stage::Fetch => "fetch",
            Stage::Dependencies => "dependency installation",
            Stage::Configure => "configure",
            Stage::Build => "build",
            Stage::Install => "install",
            Stage::Desktop => "desktop integration",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum UpdateError {
    /// Connectivity problems, stale package caches, upstream pages that no
    /// longer match. Halts the run with a diagnostic rather than guessing.
    #[error("{0}")]
    Transient(String),

    /// The download page no longer contains a version token we recognize.
    /// Usually means the upstream page layout changed.
    #[error("no version token matching `{pattern}` found at {url}")]
    ScrapeMismatch { url: String, pattern: String },

    /// A configure/compile/link step returned nonzero.
    #[error("build step `{step}` failed")]
    BuildStep { step: String },

    /// The compiled artifact exists but could not be registered with dpkg.
    /// Distinguished from a build failure: the system must not be left
    /// believing an unregistered binary is the installed version.
    #[error("package registration failed after a successful build: {reason}")]
    Registration { reason: String },

    /// Batch dependency installation failed. Always fatal for the whole run
    /// and attributed to no single application.
    #[error("dependency installation failed: {0}")]
    Dependencies(String),

    #[error("downloaded file is missing or empty: {0}")]
    EmptyDownload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A failure bound to the stage it happened in.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: UpdateError,
}

impl StageFailure {
    pub fn new(stage: Stage, source: UpdateError) -> Self {
        Self { stage, source }
    }
}

pub type StageResult<T> = Result<T, StageFailure>;
