use anyhow::Result;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Isolated environment for driving the binary: config, data and state all
/// land in a throwaway home so tests never touch the real machine.
pub struct TestEnvironment {
    home: TempDir,
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            home: TempDir::new()?,
        })
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(env!("CARGO_BIN_EXE_shackup"))
            .args(args)
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env("XDG_DATA_HOME", self.home.path().join(".local/share"))
            // CI containers build as root; the binary's root refusal is
            // exercised separately.
            .env("SHACKUP_ALLOW_ROOT", "1")
            .output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
