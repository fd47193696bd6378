//! Deploy configuration schema.
//!
//! Fields are checked by hand rather than through `serde` alone so every
//! malformed value becomes a [`ValidationError`] naming the offending key.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "master";

/// One copy source: a bare glob or a glob with an explicit base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CopySourceSpec {
    Glob(String),
    Structured(SourceGlob),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceGlob {
    pub glob: String,
    /// Path prefix kept when joining matches onto the destination.
    #[serde(default)]
    pub base: Option<String>,
}

impl CopySourceSpec {
    /// Parse `source`: a string or a sequence of strings / `{glob, base}`.
    pub fn parse_list(value: &Value, prefix: &str) -> Result<Vec<Self>, ValidationError> {
        match value {
            Value::String(glob) => Ok(vec![Self::Glob(glob.clone())]),
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(ValidationError::new(prefix, "{config}.source must not be empty"));
                }
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| Self::parse_item(item, index, prefix))
                    .collect()
            }
            other => Err(ValidationError::new(
                prefix,
                format!(
                    "{{config}}.source must be a string or an array, received {}",
                    type_name(other)
                ),
            )),
        }
    }

    fn parse_item(item: &Value, index: usize, prefix: &str) -> Result<Self, ValidationError> {
        match item {
            Value::String(glob) => Ok(Self::Glob(glob.clone())),
            Value::Object(map) => {
                let glob = map.get("glob").and_then(Value::as_str).ok_or_else(|| {
                    ValidationError::new(
                        prefix,
                        format!("{{config}}.source[{index}].glob must be a string"),
                    )
                })?;
                let base = match map.get("base") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(base)) => Some(base.clone()),
                    Some(other) => {
                        return Err(ValidationError::new(
                            prefix,
                            format!(
                                "{{config}}.source[{index}].base must be a string, received {}",
                                type_name(other)
                            ),
                        ));
                    }
                };
                Ok(Self::Structured(SourceGlob {
                    glob: glob.to_string(),
                    base,
                }))
            }
            other => Err(ValidationError::new(
                prefix,
                format!(
                    "{{config}}.source[{index}] must be a string or {{glob, base}}, received {}",
                    type_name(other)
                ),
            )),
        }
    }
}

/// Options forwarded to the copy engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CopyOptions {
    /// Recreate matched directories even when they hold no files.
    pub include_empty_dirs: bool,
    /// Remove destination files matching the glob before copying.
    pub clean: bool,
    /// Follow symlinks instead of recreating them.
    pub dereference: bool,
    /// Keep permissions and modification times.
    pub preserve: bool,
    /// Skip files whose destination is not older than the source.
    pub update: bool,
}

/// Where and how the release tree is pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleaseSettings {
    pub remote: String,
    pub branch: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

/// Passthrough knobs and release settings read from the merged options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployExtras {
    pub prune_dev_dependencies: bool,
    pub release: ReleaseSettings,
    #[serde(flatten)]
    pub copy: CopyOptions,
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
