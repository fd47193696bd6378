//! Bump command implementation.
//!
//! Points a git dependency at a new commit or tag by rewriting the fragment
//! of its range in the invocation directory's `package.json`.

use crate::error::ValidationError;
use crate::lifecycle::{Command, CommandContext, EmptyProjectPolicy};
use crate::manifest::{PackageManifest, update_range};

const PREFIX: &str = "bump";

/// Report from a bump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpReport {
    pub package: String,
    pub previous_range: String,
    pub range: String,
    /// False for a dry run
    pub written: bool,
}

#[derive(Debug, Default)]
pub struct BumpCommand;

impl BumpCommand {
    pub fn new() -> Self {
        Self
    }
}

fn required<'a>(ctx: &'a CommandContext, key: &str, label: &str) -> Result<&'a str, ValidationError> {
    ctx.options
        .str(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ValidationError::new(PREFIX, format!("missing required argument <{label}>")))
}

impl Command for BumpCommand {
    type Output = BumpReport;

    fn name(&self) -> &'static str {
        PREFIX
    }

    fn empty_project_policy(&self) -> EmptyProjectPolicy {
        EmptyProjectPolicy::Allow
    }

    async fn execute(&mut self, ctx: &CommandContext) -> anyhow::Result<BumpReport> {
        let cwd = ctx.cwd.as_path();
        tracing::debug!(prefix = PREFIX, "cwd: {}", cwd.display());
        let pkg = required(ctx, "pkg", "pkg")?;
        let version = required(ctx, "versionRange", "version-range")?;
        let dry = ctx.options.flag("dry").unwrap_or(false) || ctx.options.dry_run();
        tracing::debug!(prefix = PREFIX, "new package version: {}", version);

        let mut manifest = match PackageManifest::load(cwd)? {
            Some(manifest) if manifest.name().is_some() => manifest,
            _ => {
                return Err(ValidationError::new(
                    PREFIX,
                    format!("no package.json found under: {}", cwd.display()),
                )
                .into());
            }
        };

        let previous_range = manifest
            .dependency(pkg)
            .ok_or_else(|| {
                ValidationError::new(
                    PREFIX,
                    format!("package: {} is not found in dependencies.", pkg),
                )
            })?
            .to_string();
        let range = update_range(&previous_range, version);
        manifest.set_dependency(pkg, &range);

        if !dry {
            manifest.save()?;
        }
        crate::notice!(prefix = PREFIX, "updated version range: {}", range);

        Ok(BumpReport {
            package: pkg.to_string(),
            previous_range,
            range,
            written: !dry,
        })
    }
}
