//! `package.json` access that keeps the file's shape on write-back.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

pub const MANIFEST_FILE: &str = "package.json";
const DEFAULT_INDENT: &str = "  ";

/// A parsed `package.json`.
///
/// Key order, indentation and the trailing newline of the original file are
/// kept when saving.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    path: PathBuf,
    document: Map<String, Value>,
    indent: String,
    trailing_newline: bool,
}

impl PackageManifest {
    /// Load `dir/package.json`; `None` when the file does not exist.
    pub fn load(dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read manifest: {}", path.display()));
            }
        };
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        let Value::Object(document) = value else {
            anyhow::bail!("Expected JSON object at root: {}", path.display());
        };
        Ok(Some(Self {
            path,
            indent: detect_indent(&content),
            trailing_newline: content.ends_with('\n'),
            document,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn name(&self) -> Option<&str> {
        self.document
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Range of `pkg` in `dependencies`.
    pub fn dependency(&self, pkg: &str) -> Option<&str> {
        self.document
            .get("dependencies")
            .and_then(Value::as_object)
            .and_then(|deps| deps.get(pkg))
            .and_then(Value::as_str)
    }

    /// Replace the range of an existing dependency. Returns false when `pkg`
    /// is not listed.
    pub fn set_dependency(&mut self, pkg: &str, range: &str) -> bool {
        let Some(slot) = self
            .document
            .get_mut("dependencies")
            .and_then(Value::as_object_mut)
            .and_then(|deps| deps.get_mut(pkg))
        else {
            return false;
        };
        *slot = Value::String(range.to_string());
        true
    }

    /// Drop the `devDependencies` section. Returns whether one existed.
    pub fn remove_dev_dependencies(&mut self) -> bool {
        self.document.shift_remove("devDependencies").is_some()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.document
            .serialize(&mut serializer)
            .context("Failed to serialize manifest")?;
        let mut json = String::from_utf8(buf).context("Manifest is not valid UTF-8")?;
        if self.trailing_newline {
            json.push('\n');
        }
        Ok(json)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write manifest: {}", self.path.display()))
    }
}

/// Replace the `#fragment` of a dependency range, e.g. the commit of a
/// `git+https://host/x.git#abc` range. Everything before the first `#` is kept
/// byte for byte.
pub fn update_range(range: &str, version: &str) -> String {
    let (without_fragment, _) = range.split_once('#').unwrap_or((range, ""));
    format!("{}#{}", without_fragment, version)
}

/// Leading whitespace of the first indented line.
fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .find_map(|line| {
            let trimmed = line.trim_start();
            let width = line.len() - trimmed.len();
            (width > 0 && !trimmed.is_empty()).then(|| line[..width].to_string())
        })
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURE: &str = "{\n    \"name\": \"site\",\n    \"version\": \"1.0.0\",\n    \"dependencies\": {\n        \"ui\": \"git+https://github.com/acme/ui.git#abc123\",\n        \"left-pad\": \"^1.3.0\"\n    },\n    \"devDependencies\": {\n        \"jest\": \"^29.0.0\"\n    }\n}\n";

    fn fixture() -> (TempDir, PackageManifest) {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), FIXTURE).unwrap();
        let manifest = PackageManifest::load(temp.path()).unwrap().unwrap();
        (temp, manifest)
    }

    #[test]
    fn missing_manifest_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(PackageManifest::load(temp.path()).unwrap().is_none());
    }

    #[test]
    fn reads_name_and_dependencies() {
        let (_temp, manifest) = fixture();
        assert_eq!(manifest.name(), Some("site"));
        assert_eq!(manifest.indent(), "    ");
        assert_eq!(manifest.dependency("left-pad"), Some("^1.3.0"));
        assert!(manifest.dependency("jest").is_none());
    }

    #[test]
    fn unchanged_manifest_round_trips_byte_for_byte() {
        let (_temp, manifest) = fixture();
        assert_eq!(manifest.to_json().unwrap(), FIXTURE);
    }

    #[test]
    fn removing_dev_dependencies_keeps_everything_else() {
        let (temp, mut manifest) = fixture();
        assert!(manifest.remove_dev_dependencies());
        assert!(!manifest.remove_dev_dependencies());
        manifest.save().unwrap();

        let saved = std::fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap();
        assert!(!saved.contains("devDependencies"));
        assert!(saved.starts_with("{\n    \"name\": \"site\",\n    \"version\""));
        assert!(saved.ends_with("}\n"));
    }

    #[test]
    fn set_dependency_requires_existing_entry() {
        let (_temp, mut manifest) = fixture();
        assert!(manifest.set_dependency("left-pad", "^1.4.0"));
        assert_eq!(manifest.dependency("left-pad"), Some("^1.4.0"));
        assert!(!manifest.set_dependency("react", "^18.0.0"));
    }

    #[test]
    fn update_range_replaces_url_fragment() {
        assert_eq!(
            update_range("git+https://github.com/acme/ui.git#abc123", "def456"),
            "git+https://github.com/acme/ui.git#def456"
        );
        assert_eq!(
            update_range("git+https://github.com/acme/ui.git", "v2.0.0"),
            "git+https://github.com/acme/ui.git#v2.0.0"
        );
    }

    #[test]
    fn update_range_splits_non_url_ranges() {
        assert_eq!(update_range("acme/ui#abc", "def"), "acme/ui#def");
        assert_eq!(update_range("^1.0.0", "next"), "^1.0.0#next");
    }

    #[test]
    fn update_range_leaves_the_rest_of_a_url_untouched() {
        assert_eq!(
            update_range("https://example.com#abc", "def"),
            "https://example.com#def"
        );
        assert_eq!(
            update_range("git+https://github.com/acme/ui.git#abc", "v1 beta"),
            "git+https://github.com/acme/ui.git#v1 beta"
        );
        assert_eq!(update_range("acme/ui#abc#old", "new"), "acme/ui#new");
    }

    #[test]
    fn indent_defaults_to_two_spaces() {
        assert_eq!(detect_indent("{}"), "  ");
        assert_eq!(detect_indent("{\n\t\"a\": 1\n}"), "\t");
    }
}
