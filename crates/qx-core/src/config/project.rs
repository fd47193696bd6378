//! The loaded project configuration document.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Name of the key-path segment that refers to the document itself.
const DOCUMENT_KEY: &str = "config";

/// A project's configuration as found by the
/// [`ConfigResolver`](super::ConfigResolver).
///
/// Immutable after load. An *empty* project is the sentinel returned when no
/// config file exists; whether that is fatal is up to the command.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    document: Map<String, Value>,
    root_path: PathBuf,
    filepath: PathBuf,
    empty: bool,
}

impl ProjectConfig {
    /// Build from a parsed document located at `filepath`.
    ///
    /// The root is the file's directory, redirected by a string `root` key
    /// (resolved against that directory) when present.
    pub fn from_document(document: Map<String, Value>, filepath: PathBuf) -> Self {
        let dir = filepath
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let root_path = match document.get("root").and_then(Value::as_str) {
            Some(root) => dir.join(root),
            None => dir,
        };
        Self {
            document,
            root_path,
            filepath,
            empty: false,
        }
    }

    /// The sentinel for a directory without any config file.
    pub fn empty(start: &Path, default_file: &str) -> Self {
        Self {
            document: Map::new(),
            root_path: start.to_path_buf(),
            filepath: start.join(default_file),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn version(&self) -> Option<&str> {
        self.document.get("version").and_then(Value::as_str)
    }

    /// Object-valued top-level entry, e.g. the `deploy` command section.
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.document.get(name).and_then(Value::as_object)
    }

    /// Look up a dotted key path such as `config.deploy.dest`.
    ///
    /// The first segment must be `config`, which names the document itself.
    /// Numeric segments index into arrays.
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        let mut segments = key_path.split('.');
        if segments.next() != Some(DOCUMENT_KEY) {
            return None;
        }
        let mut current: Option<&Value> = None;
        for segment in segments {
            let next = match current {
                None => self.document.get(segment),
                Some(Value::Object(map)) => map.get(segment),
                Some(Value::Array(items)) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                Some(_) => None,
            };
            current = Some(next?);
        }
        current
    }

    /// Typed variant of [`get`](Self::get).
    pub fn get_as<T: DeserializeOwned>(&self, key_path: &str) -> anyhow::Result<Option<T>> {
        self.get(key_path)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|err| anyhow::anyhow!("Invalid value at '{}': {}", key_path, err))
            })
            .transpose()
    }

    pub fn has(&self, key_path: &str) -> bool {
        self.get(key_path).is_some()
    }

    /// Resolve a config-relative path against the project root.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root_path.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(value: Value) -> ProjectConfig {
        let Value::Object(document) = value else {
            panic!("fixture must be an object");
        };
        ProjectConfig::from_document(document, PathBuf::from("/work/site/qxjs.config.json"))
    }

    #[test]
    fn root_is_the_config_directory() {
        let project = project(json!({ "version": "1.0.0" }));
        assert_eq!(project.root_path(), Path::new("/work/site"));
        assert_eq!(project.version(), Some("1.0.0"));
        assert!(!project.is_empty());
    }

    #[test]
    fn root_key_redirects_the_root() {
        let project = project(json!({ "root": "packages/web" }));
        assert_eq!(project.root_path(), Path::new("/work/site/packages/web"));
    }

    #[test]
    fn get_walks_key_paths() {
        let project = project(json!({
            "version": "1.0.0",
            "deploy": { "dest": "../out", "source": ["a/**", { "glob": "b/**" }] }
        }));
        assert_eq!(project.get("config.version"), Some(&json!("1.0.0")));
        assert_eq!(project.get("config.deploy.dest"), Some(&json!("../out")));
        assert_eq!(
            project.get("config.deploy.source.1.glob"),
            Some(&json!("b/**"))
        );
        assert!(project.get("config.deploy.missing").is_none());
        assert!(project.get("version").is_none());
        assert!(project.has("config.deploy"));
        assert!(!project.has("config.bump"));
    }

    #[test]
    fn get_as_deserializes() {
        let project = project(json!({ "deploy": { "build": "build" } }));
        let build: Option<String> = project.get_as("config.deploy.build").unwrap();
        assert_eq!(build.as_deref(), Some("build"));
        let bad: anyhow::Result<Option<u32>> = project.get_as("config.deploy.build");
        assert!(bad.is_err());
    }

    #[test]
    fn empty_project_is_rooted_at_start() {
        let project = ProjectConfig::empty(Path::new("/tmp/none"), "qxjs.config.js");
        assert!(project.is_empty());
        assert_eq!(project.root_path(), Path::new("/tmp/none"));
        assert_eq!(project.filepath(), Path::new("/tmp/none/qxjs.config.js"));
        assert!(project.section("deploy").is_none());
    }
}
