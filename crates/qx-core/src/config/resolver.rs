//! Config file discovery.
//!
//! Searches a directory and its ancestors for the first recognized config
//! file. A missing config is not an error: the resolver returns an empty
//! [`ProjectConfig`] and leaves the decision to the command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{Map, Value};

use super::ProjectConfig;
use crate::error::ValidationError;

pub const JS_CONFIG: &str = "qxjs.config.js";
pub const JSON_CONFIG: &str = "qxjs.config.json";
pub const TOML_CONFIG: &str = "qxjs.config.toml";
pub const PACKAGE_MANIFEST: &str = "package.json";

/// Section of `package.json` that holds embedded config.
pub const PACKAGE_SECTION: &str = "qxjs";

/// Candidate file names, in search order.
pub const SEARCH_PLACES: [&str; 4] = [JS_CONFIG, JSON_CONFIG, TOML_CONFIG, PACKAGE_MANIFEST];

#[derive(Debug, Clone)]
pub struct ConfigResolver {
    stop_dir: Option<PathBuf>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Search upward, stopping after the user's home directory.
    pub fn new() -> Self {
        Self {
            stop_dir: dirs::home_dir(),
        }
    }

    /// Search upward, stopping after `stop_dir` (inclusive).
    pub fn with_stop_dir(stop_dir: impl Into<PathBuf>) -> Self {
        Self {
            stop_dir: Some(stop_dir.into()),
        }
    }

    /// Resolve the project config starting at `start`.
    pub fn resolve(&self, start: &Path) -> anyhow::Result<ProjectConfig> {
        let start = std::path::absolute(start)
            .with_context(|| format!("Failed to resolve path: {}", start.display()))?;

        for dir in start.ancestors() {
            for place in SEARCH_PLACES {
                let candidate = dir.join(place);
                if let Some(document) = load_candidate(&candidate)? {
                    tracing::debug!(prefix = "config", "found config: {}", candidate.display());
                    return Ok(ProjectConfig::from_document(document, candidate));
                }
            }
            if self.stop_dir.as_deref() == Some(dir) {
                break;
            }
        }

        tracing::debug!(
            prefix = "config",
            "couldn't find config in: {}",
            start.display()
        );
        Ok(ProjectConfig::empty(&start, JS_CONFIG))
    }
}

/// Load one candidate file; `None` when it does not exist or does not carry
/// qx config.
fn load_candidate(path: &Path) -> anyhow::Result<Option<Map<String, Value>>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) if err.kind() == std::io::ErrorKind::IsADirectory => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match name {
        JS_CONFIG => Err(ValidationError::new(
            "config",
            format!(
                "{} is a JavaScript config, which qx cannot evaluate. Move its contents to {} or {}.",
                path.display(),
                JSON_CONFIG,
                TOML_CONFIG
            ),
        )
        .into()),
        JSON_CONFIG => parse_json(path, &content).map(Some),
        TOML_CONFIG => parse_toml(path, &content).map(Some),
        PACKAGE_MANIFEST => {
            let mut manifest = parse_json(path, &content)?;
            match manifest.remove(PACKAGE_SECTION) {
                Some(Value::Object(section)) => Ok(Some(section)),
                Some(_) => Err(ValidationError::new(
                    "config",
                    format!(
                        "\"{}\" in {} must be an object",
                        PACKAGE_SECTION,
                        path.display()
                    ),
                )
                .into()),
                None => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

fn parse_json(path: &Path, content: &str) -> anyhow::Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(content).map_err(|err| {
        ValidationError::new(
            "JSONError",
            format!("{} in {}", err, path.display()),
        )
    })?;
    into_object(path, value)
}

fn parse_toml(path: &Path, content: &str) -> anyhow::Result<Map<String, Value>> {
    let value: Value = toml::from_str(content).map_err(|err| {
        ValidationError::new(
            "TOMLError",
            format!("{} in {}", err.message(), path.display()),
        )
    })?;
    into_object(path, value)
}

fn into_object(path: &Path, value: Value) -> anyhow::Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ValidationError::new(
            "config",
            format!("{} must contain an object", path.display()),
        )
        .into()),
    }
}
