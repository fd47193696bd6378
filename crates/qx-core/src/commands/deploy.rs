//! Deploy command implementation.
//!
//! Builds the project, copies the build output into a separate release
//! working copy, then commits, bumps and pushes that working copy.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use crate::config::{CommandOptions, CopyOptions, DeployExtras, ProjectConfig};
use crate::copy::{CopyEngine, CopyReport, GlobCopyEngine};
use crate::cwd::CwdGuard;
use crate::error::ValidationError;
use crate::git::{SystemGit, Vcs};
use crate::lifecycle::{Command, CommandContext, EmptyProjectPolicy};
use crate::logging;
use crate::progress::StepProgress;
use crate::runner::{NpmRunner, StandardVersion, TaskRunner, VersionBumper};
use crate::steps::{
    CopyConfig, CopyStep, PruneConfig, PruneDevDepsStep, ReleaseConfig, ReleaseContext,
    ReleaseStep, SubCommand, run_blocking,
};

const PREFIX: &str = "deploy";

/// Choices accepted by `--demo-folder-option`.
pub const DEMO_FOLDER_CHOICES: [&str; 2] = ["demo choice", "demo choice 2"];

/// External collaborators used by a deploy.
#[derive(Clone)]
pub struct DeployServices {
    pub vcs: Arc<dyn Vcs>,
    pub copy_engine: Arc<dyn CopyEngine>,
    pub task_runner: Arc<dyn TaskRunner>,
    pub bumper: Arc<dyn VersionBumper>,
}

impl Default for DeployServices {
    fn default() -> Self {
        Self {
            vcs: Arc::new(SystemGit),
            copy_engine: Arc::new(GlobCopyEngine),
            task_runner: Arc::new(NpmRunner),
            bumper: Arc::new(StandardVersion),
        }
    }
}

impl DeployServices {
    pub fn with_vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_copy_engine(mut self, engine: Arc<dyn CopyEngine>) -> Self {
        self.copy_engine = engine;
        self
    }

    pub fn with_task_runner(mut self, runner: Arc<dyn TaskRunner>) -> Self {
        self.task_runner = runner;
        self
    }

    pub fn with_bumper(mut self, bumper: Arc<dyn VersionBumper>) -> Self {
        self.bumper = bumper;
        self
    }
}

/// Report from a deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Commit id of the pushed release tree
    pub commit: String,
    /// HEAD of the source tree the release was built from
    pub source_commit: String,
    /// What the copy step wrote
    pub copied: CopyReport,
    /// Whether devDependencies were stripped from the release manifest
    pub pruned: bool,
}

/// Validated deploy settings
#[derive(Debug, Clone)]
struct DeploySettings {
    build: String,
    dest: PathBuf,
}

impl DeploySettings {
    fn from_options(options: &CommandOptions, project: &ProjectConfig) -> Result<Self, ValidationError> {
        let build = match options.get("build") {
            Some(Value::String(build)) if !build.trim().is_empty() => build.clone(),
            _ => {
                return Err(ValidationError::new(
                    PREFIX,
                    "{config}.build must name the package script that builds the project",
                ));
            }
        };
        let dest = match options.get("dest") {
            Some(Value::String(dest)) if !dest.trim().is_empty() => project.resolve_path(dest),
            _ => {
                return Err(ValidationError::new(
                    PREFIX,
                    "{config}.dest must be the path of the release working copy",
                ));
            }
        };
        if !dest.exists() {
            return Err(ValidationError::new(
                PREFIX,
                format!("{{config}}.dest does not exist: {}", dest.display()),
            ));
        }
        if !dest.is_dir() {
            return Err(ValidationError::new(
                PREFIX,
                format!("{{config}}.dest is not a directory: {}", dest.display()),
            ));
        }
        Ok(Self { build, dest })
    }
}

/// Deploy command orchestrator
pub struct DeployCommand {
    services: DeployServices,
    copy: CopyStep,
    release: ReleaseStep,
    prune: PruneDevDepsStep,
    /// Set from `deploy.pruneDevDependencies`
    prune_enabled: bool,
}

impl Default for DeployCommand {
    fn default() -> Self {
        Self::new(DeployServices::default())
    }
}

impl DeployCommand {
    pub fn new(services: DeployServices) -> Self {
        Self {
            copy: CopyStep::new(Arc::clone(&services.copy_engine)),
            release: ReleaseStep::new(Arc::clone(&services.vcs), Arc::clone(&services.bumper)),
            prune: PruneDevDepsStep::new(),
            prune_enabled: false,
            services,
        }
    }
}

impl Command for DeployCommand {
    type Output = DeployReport;

    fn name(&self) -> &'static str {
        PREFIX
    }

    fn empty_project_policy(&self) -> EmptyProjectPolicy {
        EmptyProjectPolicy::Reject
    }

    async fn initialize(&mut self, ctx: &CommandContext) -> anyhow::Result<()> {
        let options = &ctx.options;
        let root = ctx.root().to_path_buf();
        let extras: DeployExtras = options.view(PREFIX)?;
        let dry_run = options.dry_run();

        if let Some(choice) = options.str("demoFolderOption") {
            tracing::debug!(prefix = PREFIX, "demo folder option: {}", choice);
        }
        if dry_run {
            crate::notice!(prefix = PREFIX, "dry-run: release commands will be logged, not run");
        }

        let dest = options.get("dest").cloned().unwrap_or(Value::Null);
        self.copy.initialize(CopyConfig {
            source: options.get("source").cloned().unwrap_or(Value::Null),
            dest: dest.clone(),
            options: CopyOptions {
                include_empty_dirs: true,
                ..extras.copy
            },
            root: root.clone(),
        });
        self.release.initialize(ReleaseConfig {
            cwd: dest.as_str().map(str::to_string),
            root: root.clone(),
            settings: extras.release,
            dry_run,
        });
        self.prune_enabled = extras.prune_dev_dependencies;
        self.prune.initialize(PruneConfig {
            cwd: dest.as_str().unwrap_or_default().to_string(),
            root,
            dry_run,
        });
        Ok(())
    }

    async fn execute(&mut self, ctx: &CommandContext) -> anyhow::Result<DeployReport> {
        let root = ctx.root();
        let guard = CwdGuard::enter(root)?;
        let total = if self.prune_enabled { 6 } else { 5 };
        let mut progress = StepProgress::new(total, ctx.options.progress());

        let settings = DeploySettings::from_options(&ctx.options, &ctx.project)?;
        self.copy.validate()?;
        self.release.validate()?;

        progress.advance("check source tree");
        let source_root = root.to_path_buf();
        let vcs = Arc::clone(&self.services.vcs);
        if !run_blocking(move || vcs.is_clean(&source_root)).await? {
            return Err(ValidationError::new(
                PREFIX,
                format!(
                    "Working tree at {} has uncommitted changes; commit or stash them before deploying",
                    root.display()
                ),
            )
            .into());
        }

        progress.advance("build");
        {
            let _paused = logging::pause();
            let runner = Arc::clone(&self.services.task_runner);
            let build_root = root.to_path_buf();
            let build = settings.build.clone();
            run_blocking(move || runner.run_script(&build_root, &build))
                .await
                .with_context(|| format!("Build script '{}' failed", settings.build))?;
        }
        let source_root = root.to_path_buf();
        let vcs = Arc::clone(&self.services.vcs);
        let source_commit = run_blocking(move || vcs.head_commit(&source_root)).await?;
        tracing::info!(prefix = PREFIX, "built from {}", source_commit);

        progress.advance("clean release tree");
        let release = self.release.clone();
        let dest = settings.dest.clone();
        run_blocking(move || release.cleanup(&dest)).await?;

        progress.advance("copy");
        let copied = self.copy.execute(()).await?;

        let mut pruned = false;
        if self.prune_enabled {
            progress.advance("prune devDependencies");
            pruned = self.prune.execute(()).await?;
        }

        progress.advance("release");
        let commit = self
            .release
            .execute(ReleaseContext {
                source_commit: Some(source_commit.clone()),
            })
            .await?;

        guard.leave();
        progress.finish("deployed");
        crate::success!(prefix = PREFIX, "released commit {}", commit);

        Ok(DeployReport {
            commit,
            source_commit,
            copied,
            pruned,
        })
    }
}
