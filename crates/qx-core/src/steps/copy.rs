use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tokio::task::JoinSet;

use super::{SubCommand, not_initialized};
use crate::config::schema::type_name;
use crate::config::{CopyOptions, CopySourceSpec};
use crate::copy::{CopyEngine, CopyReport, effective_destination, resolve_source_path};
use crate::error::ValidationError;

/// Raw copy configuration. `source` and `dest` stay untyped until
/// [`CopyStep::validate`] so type mistakes surface as validation errors.
#[derive(Debug, Clone)]
pub struct CopyConfig {
    pub source: Value,
    pub dest: Value,
    pub options: CopyOptions,
    /// Globs and `dest` are resolved against this directory.
    pub root: PathBuf,
}

/// Copies every configured source glob into the destination, one blocking
/// task per source.
pub struct CopyStep {
    engine: Arc<dyn CopyEngine>,
    config: Option<CopyConfig>,
}

struct CopyPlan {
    pattern: String,
    target: PathBuf,
}

impl CopyStep {
    pub fn new(engine: Arc<dyn CopyEngine>) -> Self {
        Self {
            engine,
            config: None,
        }
    }

    fn plan(&self) -> Result<(Vec<CopyPlan>, CopyOptions), ValidationError> {
        let name = self.name();
        let config = self.config.as_ref().ok_or_else(|| not_initialized(&name))?;
        let specs = CopySourceSpec::parse_list(&config.source, &name)?;
        let dest = match &config.dest {
            Value::String(dest) => dest,
            other => {
                return Err(ValidationError::new(
                    &name,
                    format!("{{config}}.dest must be a string, received {}", type_name(other)),
                ));
            }
        };
        let dest_root = config.root.join(dest);

        let plans = specs
            .iter()
            .map(|spec| {
                let resolved = resolve_source_path(spec);
                CopyPlan {
                    pattern: config.root.join(&resolved.glob).to_string_lossy().into_owned(),
                    target: effective_destination(&dest_root, &resolved.base),
                }
            })
            .collect();
        let options = CopyOptions {
            include_empty_dirs: true,
            ..config.options
        };
        Ok((plans, options))
    }
}

impl SubCommand for CopyStep {
    type Config = CopyConfig;
    type Input = ();
    type Output = CopyReport;

    fn initialize(&mut self, config: CopyConfig) {
        self.config = Some(config);
    }

    fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.plan().map(|_| ())
    }

    async fn execute(&self, _input: ()) -> anyhow::Result<CopyReport> {
        let name = self.name();
        let (plans, options) = self.plan()?;

        let mut tasks = JoinSet::new();
        for plan in plans {
            tracing::info!(prefix = %name, "{} -> {}", plan.pattern, plan.target.display());
            let engine = Arc::clone(&self.engine);
            tasks.spawn_blocking(move || engine.copy(&plan.pattern, &plan.target, &options));
        }

        // Every copy runs to completion; the first failure to arrive wins.
        let mut report = CopyReport::default();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.context("Copy task failed to complete").and_then(|copied| copied) {
                Ok(part) => report += part,
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }

        crate::success!(prefix = %name, "copied {} files", report.files);
        Ok(report)
    }
}
