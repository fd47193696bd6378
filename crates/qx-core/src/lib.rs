//! qx Core Library
//!
//! Deployment automation for web projects: resolves a project's `qxjs`
//! configuration, builds it, copies the build output into a release working
//! copy and commits, version-bumps and pushes that working copy.

pub mod commands;
pub mod config;
pub mod copy;
pub mod cwd;
pub mod env;
pub mod error;
pub mod git;
pub mod lifecycle;
pub mod logging;
pub mod manifest;
pub mod progress;
pub mod runner;
pub mod steps;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        CommandOptions, ConfigResolver, CopyOptions, CopySourceSpec, OptionLayers, ProjectConfig,
        ReleaseSettings,
    };

    // Lifecycle
    pub use crate::env::Environment;
    pub use crate::lifecycle::{
        Command, CommandArgs, CommandContext, EmptyProjectPolicy, Lifecycle,
    };

    // Commands
    pub use crate::commands::{BumpCommand, BumpReport, DeployCommand, DeployReport, DeployServices};

    // Steps
    pub use crate::steps::{CopyStep, PruneDevDepsStep, ReleaseStep, SubCommand};

    // Collaborators
    pub use crate::copy::{CopyEngine, CopyReport, GlobCopyEngine};
    pub use crate::git::{ExecResult, SystemGit, Vcs};
    pub use crate::runner::{BumpFlags, NpmRunner, StandardVersion, TaskRunner, VersionBumper};

    // Errors
    pub use crate::error::{CommandFailed, ErrorKind, ValidationError};
    pub use crate::logging::LogLevel;
}
