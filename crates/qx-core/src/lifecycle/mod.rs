//! The fixed phase sequence every command runs through.
//!
//! ```text
//! ResolveProject -> ConfigureEnvironment -> ConfigureOptions
//!   -> ConfigureLogging -> EmptyProjectGuard -> Initialize -> Execute
//! ```
//!
//! Any phase may fail, which ends the run with that error. [`Lifecycle::run`]
//! consumes the lifecycle, so an invocation is awaited exactly once.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{CommandOptions, ConfigResolver, OptionLayers, OptionMap, ProjectConfig};
use crate::env::Environment;
use crate::error::ValidationError;
use crate::logging;

/// What a command does when no config file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyProjectPolicy {
    #[default]
    Reject,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolveProject,
    ConfigureEnvironment,
    ConfigureOptions,
    ConfigureLogging,
    EmptyProjectGuard,
    Initialize,
    Execute,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ResolveProject => "resolve project",
            Phase::ConfigureEnvironment => "configure environment",
            Phase::ConfigureOptions => "configure options",
            Phase::ConfigureLogging => "configure logging",
            Phase::EmptyProjectGuard => "empty project guard",
            Phase::Initialize => "initialize",
            Phase::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// Hooks a top-level command plugs into the lifecycle.
#[allow(async_fn_in_trait)]
pub trait Command {
    type Output;

    /// Name of the config section holding this command's options.
    fn name(&self) -> &'static str;

    fn empty_project_policy(&self) -> EmptyProjectPolicy {
        EmptyProjectPolicy::Reject
    }

    async fn initialize(&mut self, _ctx: &CommandContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn execute(&mut self, ctx: &CommandContext) -> anyhow::Result<Self::Output>;
}

/// Raw invocation input.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    pub cwd: PathBuf,
    /// Explicit project location; relative paths resolve against `cwd`.
    pub project_path: Option<PathBuf>,
    /// Options given on the command line, keyed by their camelCase name.
    pub argv: OptionMap,
}

impl CommandArgs {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    pub fn with_project_path(mut self, path: Option<PathBuf>) -> Self {
        self.project_path = path;
        self
    }

    /// Record a command-line option. `None` leaves the key unset so lower
    /// layers can supply it.
    pub fn with_arg(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.argv.insert(key.to_string(), value.into());
        }
        self
    }

    fn start_dir(&self) -> PathBuf {
        match &self.project_path {
            Some(path) => self.cwd.join(path),
            None => self.cwd.clone(),
        }
    }
}

/// Everything a command sees once the lifecycle has configured it.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Directory the command was invoked from.
    pub cwd: PathBuf,
    pub project: ProjectConfig,
    pub options: CommandOptions,
    pub environment: Environment,
}

impl CommandContext {
    pub fn root(&self) -> &Path {
        self.project.root_path()
    }
}

pub struct Lifecycle {
    args: CommandArgs,
    resolver: ConfigResolver,
    environment: Option<Environment>,
}

impl Lifecycle {
    pub fn new(args: CommandArgs) -> Self {
        Self {
            args,
            resolver: ConfigResolver::new(),
            environment: None,
        }
    }

    pub fn with_resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Use a fixed environment instead of detecting one.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub async fn run<C: Command>(self, command: &mut C) -> anyhow::Result<C::Output> {
        let name = command.name();

        enter_phase(name, Phase::ResolveProject);
        let project = self.resolver.resolve(&self.args.start_dir())?;

        enter_phase(name, Phase::ConfigureEnvironment);
        let environment = self.environment.unwrap_or_else(Environment::detect);
        let defaults = environment.defaults();

        enter_phase(name, Phase::ConfigureOptions);
        let options = OptionLayers::collect(self.args.argv, &project, name, &defaults).resolve();

        enter_phase(name, Phase::ConfigureLogging);
        configure_logging(&options)?;

        enter_phase(name, Phase::EmptyProjectGuard);
        if project.is_empty() && command.empty_project_policy() == EmptyProjectPolicy::Reject {
            return Err(ValidationError::new(
                name,
                format!(
                    "No qxjs config found in {} or its parents; add qxjs.config.json, qxjs.config.toml or a \"qxjs\" section to package.json",
                    project.root_path().display()
                ),
            )
            .into());
        }

        let ctx = CommandContext {
            cwd: self.args.cwd,
            project,
            options,
            environment,
        };

        enter_phase(name, Phase::Initialize);
        command.initialize(&ctx).await?;

        enter_phase(name, Phase::Execute);
        command.execute(&ctx).await
    }
}

fn enter_phase(command: &str, phase: Phase) {
    tracing::debug!(prefix = "lifecycle", "{}: {}", command, phase);
}

fn configure_logging(options: &CommandOptions) -> Result<(), ValidationError> {
    let level = options.loglevel()?.unwrap_or_default();
    logging::set_level(level);
    logging::set_color(options.color());
    logging::resume();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_path_resolves_against_cwd() {
        let args = CommandArgs::new("/work").with_project_path(Some(PathBuf::from("site")));
        assert_eq!(args.start_dir(), Path::new("/work/site"));

        let absolute = CommandArgs::new("/work").with_project_path(Some(PathBuf::from("/srv/site")));
        assert_eq!(absolute.start_dir(), Path::new("/srv/site"));

        assert_eq!(CommandArgs::new("/work").start_dir(), Path::new("/work"));
    }

    #[test]
    fn unset_args_are_skipped() {
        let args = CommandArgs::new("/work")
            .with_arg("loglevel", Some("verbose"))
            .with_arg("progress", None::<bool>);
        assert_eq!(args.argv.get("loglevel"), Some(&Value::from("verbose")));
        assert!(!args.argv.contains_key("progress"));
    }
}
