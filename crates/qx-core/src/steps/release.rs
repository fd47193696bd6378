use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{SubCommand, not_initialized, run_blocking};
use crate::config::ReleaseSettings;
use crate::error::ValidationError;
use crate::git::Vcs;
use crate::runner::{BumpFlags, VersionBumper};

#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Release working copy, relative to `root`.
    pub cwd: Option<String>,
    pub root: PathBuf,
    pub settings: ReleaseSettings,
    /// Log mutating commands instead of running them.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseContext {
    /// HEAD of the source tree the release was built from.
    pub source_commit: Option<String>,
}

/// The release working copy every VCS call of one release runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkTree {
    dir: PathBuf,
}

impl WorkTree {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Resets, commits, bumps and pushes the release working copy.
#[derive(Clone)]
pub struct ReleaseStep {
    vcs: Arc<dyn Vcs>,
    bumper: Arc<dyn VersionBumper>,
    bump_flags: BumpFlags,
    config: Option<ReleaseConfig>,
}

impl ReleaseStep {
    pub fn new(vcs: Arc<dyn Vcs>, bumper: Arc<dyn VersionBumper>) -> Self {
        Self {
            vcs,
            bumper,
            bump_flags: BumpFlags::default(),
            config: None,
        }
    }

    fn config(&self) -> Result<&ReleaseConfig, ValidationError> {
        self.config
            .as_ref()
            .ok_or_else(|| not_initialized(&self.name()))
    }

    /// Resolve `path` against the project root.
    pub fn enter(&self, path: &Path) -> Result<WorkTree, ValidationError> {
        let config = self.config()?;
        let dir = config.root.join(path);
        tracing::info!(prefix = %self.name(), "enter {}", dir.display());
        Ok(WorkTree { dir })
    }

    pub fn leave(&self, tree: WorkTree) {
        tracing::info!(prefix = %self.name(), "leave {}", tree.dir.display());
    }

    /// Throw away every local change in `dir` and sync it with the release
    /// branch.
    pub fn cleanup(&self, dir: &Path) -> anyhow::Result<()> {
        let config = self.config()?;
        let ReleaseSettings { remote, branch } = &config.settings;
        self.mutate(dir, &["clean", "-dfx"])?;
        self.mutate(dir, &["reset", "--hard"])?;
        self.mutate(dir, &["checkout", branch.as_str()])?;
        self.mutate(dir, &["pull", remote.as_str(), branch.as_str()])?;
        crate::success!(prefix = %self.name(), "cleaned {}", dir.display());
        Ok(())
    }

    fn mutate(&self, dir: &Path, args: &[&str]) -> anyhow::Result<()> {
        let dry_run = self.config.as_ref().is_some_and(|config| config.dry_run);
        if dry_run {
            crate::notice!(prefix = %self.name(), "dry-run: git {}", args.join(" "));
            return Ok(());
        }
        self.vcs.run(dir, args)?;
        Ok(())
    }

    fn bump(&self, dir: &Path, dry_run: bool) -> anyhow::Result<()> {
        if dry_run {
            crate::notice!(prefix = %self.name(), "dry-run: bump version in {}", dir.display());
            return Ok(());
        }
        self.bumper.bump(dir, &self.bump_flags)
    }
}

pub fn commit_message(source_commit: Option<&str>) -> String {
    match source_commit {
        Some(commit) => format!("release: build from {}", commit),
        None => format!("release: {}", chrono::Local::now().to_rfc2822()),
    }
}

impl SubCommand for ReleaseStep {
    type Config = ReleaseConfig;
    type Input = ReleaseContext;
    /// The released commit id.
    type Output = String;

    fn initialize(&mut self, config: ReleaseConfig) {
        self.config = Some(config);
    }

    fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let config = self.config()?;
        match config.cwd.as_deref() {
            Some(cwd) if !cwd.trim().is_empty() => {}
            _ => {
                return Err(ValidationError::new(
                    self.name(),
                    "release directory is not configured",
                ));
            }
        }
        if config.settings.remote.is_empty() || config.settings.branch.is_empty() {
            return Err(ValidationError::new(
                self.name(),
                "{config}.release.remote and {config}.release.branch must not be empty",
            ));
        }
        Ok(())
    }

    async fn execute(&self, context: ReleaseContext) -> anyhow::Result<String> {
        self.validate()?;
        let step = self.clone();
        run_blocking(move || step.release(context)).await
    }
}

impl ReleaseStep {
    fn release(&self, context: ReleaseContext) -> anyhow::Result<String> {
        let config = self.config()?;
        let cwd = config.cwd.as_deref().unwrap_or_default();
        let tree = self.enter(Path::new(cwd))?;
        let dir = tree.dir();

        if self.vcs.is_clean(dir)? {
            tracing::warn!(prefix = %self.name(), "nothing to commit, push-only release");
        } else {
            let message = commit_message(context.source_commit.as_deref());
            self.mutate(dir, &["add", "."])?;
            self.mutate(dir, &["commit", "-m", message.as_str()])?;
            self.bump(dir, config.dry_run)?;
        }

        let ReleaseSettings { remote, branch } = &config.settings;
        self.mutate(dir, &["push", "--follow-tags", remote.as_str(), branch.as_str()])?;

        let commit = self.vcs.head_commit(dir)?;
        self.leave(tree);
        crate::success!(prefix = %self.name(), "released {}", commit);
        Ok(commit)
    }
}
