//! External build and release tooling.
//!
//! - [`TaskRunner`] runs a named package script (`npm run <name>`).
//! - [`VersionBumper`] bumps the release version and changelog
//!   (`npx standard-version`).
//!
//! Both resolve to a [`ProcessSpec`] that is spawned with an explicit working
//! directory and inherited stdio, so tool output reaches the user unchanged.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;

use crate::error::CommandFailed;

#[cfg(windows)]
const NPM: &str = "npm.cmd";
#[cfg(not(windows))]
const NPM: &str = "npm";

#[cfg(windows)]
const NPX: &str = "npx.cmd";
#[cfg(not(windows))]
const NPX: &str = "npx";

pub const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";

/// A concrete program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub command: String,
    pub args: Vec<String>,
}

impl ProcessSpec {
    pub fn display(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn in `cwd` with inherited stdio and wait. Non-zero exit becomes
    /// [`CommandFailed`] carrying the exit status.
    pub fn run_inherited(&self, cwd: &Path) -> anyhow::Result<()> {
        let shown = self.display();
        tracing::debug!(prefix = "exec", "{} (in {})", shown, cwd.display());
        let status = Command::new(&self.command)
            .args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("Failed to run {}", shown))?;
        if !status.success() {
            return Err(CommandFailed {
                command: shown,
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            }
            .into());
        }
        Ok(())
    }
}

pub trait TaskRunner: Send + Sync {
    fn run_script(&self, cwd: &Path, script: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NpmRunner;

impl NpmRunner {
    pub fn spec(script: &str) -> ProcessSpec {
        ProcessSpec {
            command: NPM.to_string(),
            args: vec!["run".to_string(), script.to_string()],
        }
    }
}

impl TaskRunner for NpmRunner {
    fn run_script(&self, cwd: &Path, script: &str) -> anyhow::Result<()> {
        Self::spec(script).run_inherited(cwd)
    }
}

/// Flags for the version bump that follows a release commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpFlags {
    /// Skip git hooks on the bump commit.
    pub no_verify: bool,
    pub infile: String,
    pub silent: bool,
}

impl Default for BumpFlags {
    fn default() -> Self {
        Self {
            no_verify: true,
            infile: DEFAULT_CHANGELOG.to_string(),
            silent: true,
        }
    }
}

pub trait VersionBumper: Send + Sync {
    fn bump(&self, cwd: &Path, flags: &BumpFlags) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardVersion;

impl StandardVersion {
    pub fn spec(flags: &BumpFlags) -> ProcessSpec {
        let mut args = vec!["--no-install".to_string(), "standard-version".to_string()];
        if flags.no_verify {
            args.push("--no-verify".to_string());
        }
        args.push("--infile".to_string());
        args.push(flags.infile.clone());
        if flags.silent {
            args.push("--silent".to_string());
        }
        ProcessSpec {
            command: NPX.to_string(),
            args,
        }
    }
}

impl VersionBumper for StandardVersion {
    fn bump(&self, cwd: &Path, flags: &BumpFlags) -> anyhow::Result<()> {
        Self::spec(flags).run_inherited(cwd)
    }
}
