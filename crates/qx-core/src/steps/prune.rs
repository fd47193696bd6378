use std::path::PathBuf;

use super::{SubCommand, not_initialized};
use crate::error::ValidationError;
use crate::manifest::PackageManifest;

#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// Directory holding the `package.json`, relative to `root`.
    pub cwd: String,
    pub root: PathBuf,
    pub dry_run: bool,
}

/// Strips `devDependencies` from a released `package.json` so consumers of
/// the release tree never install build tooling.
#[derive(Debug, Default)]
pub struct PruneDevDepsStep {
    config: Option<PruneConfig>,
}

impl PruneDevDepsStep {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubCommand for PruneDevDepsStep {
    type Config = PruneConfig;
    type Input = ();
    /// Whether the manifest changed.
    type Output = bool;

    fn initialize(&mut self, config: PruneConfig) {
        self.config = Some(config);
    }

    fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| not_initialized(&self.name()))?;
        if config.cwd.trim().is_empty() {
            return Err(ValidationError::new(self.name(), "{config}.cwd must not be empty"));
        }
        Ok(())
    }

    async fn execute(&self, _input: ()) -> anyhow::Result<bool> {
        self.validate()?;
        let name = self.name();
        let Some(config) = self.config.as_ref() else {
            return Err(not_initialized(&name).into());
        };
        let dir = config.root.join(&config.cwd);

        let mut manifest = match PackageManifest::load(&dir)? {
            Some(manifest) if manifest.name().is_some() => manifest,
            _ => {
                tracing::error!(prefix = %name, "no package.json found under: {}", dir.display());
                return Ok(false);
            }
        };

        if !manifest.remove_dev_dependencies() {
            tracing::info!(prefix = %name, "no devDependencies in {}", manifest.path().display());
            return Ok(false);
        }

        if config.dry_run {
            crate::notice!(prefix = %name, "dry-run: would remove devDependencies from {}", manifest.path().display());
        } else {
            manifest.save()?;
            crate::success!(prefix = %name, "removed devDependencies from {}", manifest.path().display());
        }
        Ok(true)
    }
}
