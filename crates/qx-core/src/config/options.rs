//! Layered option resolution.
//!
//! Four layers, highest precedence first:
//! CLI argv -> project command section -> project root config -> environment
//! defaults. A key is taken from the first layer that defines it; later layers
//! only fill gaps. `null` counts as undefined.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ProjectConfig;
use crate::env::EnvDefaults;
use crate::error::ValidationError;
use crate::logging::LogLevel;

pub type OptionMap = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionLayers {
    pub argv: OptionMap,
    pub command: OptionMap,
    pub root: OptionMap,
    pub env: OptionMap,
}

impl OptionLayers {
    /// Collect layers for `command_name` from a project and the environment.
    ///
    /// The root layer holds the document's non-object entries; object entries
    /// are sections and only the command's own section is applied.
    pub fn collect(
        argv: OptionMap,
        project: &ProjectConfig,
        command_name: &str,
        env: &EnvDefaults,
    ) -> Self {
        let command = project.section(command_name).cloned().unwrap_or_default();
        let root = project
            .document()
            .iter()
            .filter(|(_, value)| !value.is_object())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            argv,
            command,
            root,
            env: env.to_layer(),
        }
    }

    pub fn resolve(&self) -> CommandOptions {
        let mut values = OptionMap::new();
        for layer in [&self.argv, &self.command, &self.root, &self.env] {
            for (key, value) in layer {
                if value.is_null() || values.contains_key(key) {
                    continue;
                }
                values.insert(key.clone(), value.clone());
            }
        }
        CommandOptions { values }
    }
}

/// The merged option set for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOptions {
    values: OptionMap,
}

impl CommandOptions {
    pub fn from_map(values: OptionMap) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn loglevel(&self) -> Result<Option<LogLevel>, ValidationError> {
        match self.get("loglevel") {
            None => Ok(None),
            Some(Value::String(name)) => name
                .parse()
                .map(Some)
                .map_err(|msg: String| ValidationError::new("options", msg)),
            Some(other) => Err(ValidationError::new(
                "options",
                format!("loglevel must be a string, received {other}"),
            )),
        }
    }

    /// Progress output is on unless something turned it off.
    pub fn progress(&self) -> bool {
        self.flag("progress").unwrap_or(true)
    }

    pub fn color(&self) -> bool {
        self.flag("color").unwrap_or(false)
    }

    pub fn ci(&self) -> bool {
        self.flag("ci").unwrap_or(false)
    }

    pub fn dry_run(&self) -> bool {
        self.flag("dryRun").unwrap_or(false)
    }

    /// Deserialize the whole option set into a typed view.
    pub fn view<T: DeserializeOwned>(&self, prefix: &str) -> Result<T, ValidationError> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|err| ValidationError::new(prefix, format!("invalid options: {err}")))
    }
}
