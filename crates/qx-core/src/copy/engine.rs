//! Default file copy engine: glob expansion plus structure-preserving copies.

use std::fs::{self, Metadata};
use std::ops::AddAssign;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use filetime::FileTime;

use super::resolve::has_glob_meta;
use crate::config::CopyOptions;

/// Copies everything matched by a glob into a destination directory.
pub trait CopyEngine: Send + Sync {
    fn copy(&self, pattern: &str, dest: &Path, options: &CopyOptions)
    -> anyhow::Result<CopyReport>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub files: usize,
    pub dirs: usize,
    pub skipped: usize,
    pub removed: usize,
}

impl AddAssign for CopyReport {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.dirs += other.dirs;
        self.skipped += other.skipped;
        self.removed += other.removed;
    }
}

/// Expands patterns with the `glob` crate. Matches keep their path relative to
/// the pattern's static parent (its leading segments without wildcards).
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobCopyEngine;

impl CopyEngine for GlobCopyEngine {
    fn copy(
        &self,
        pattern: &str,
        dest: &Path,
        options: &CopyOptions,
    ) -> anyhow::Result<CopyReport> {
        let pattern = expand_trailing_globstar(normalize_lexically(Path::new(pattern)));
        let parent = static_parent(&pattern);
        let relative_pattern = pattern
            .strip_prefix(&parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut report = CopyReport::default();
        if options.clean && !relative_pattern.as_os_str().is_empty() {
            report.removed = clean_destination(dest, &relative_pattern)?;
        }

        let pattern_str = path_str(&pattern)?;
        let matches = glob::glob(pattern_str)
            .with_context(|| format!("Invalid glob pattern: {}", pattern_str))?;

        for entry in matches {
            let source = entry.context("Failed to read glob match")?;
            let relative = source.strip_prefix(&parent).with_context(|| {
                format!(
                    "Glob match {} is outside {}",
                    source.display(),
                    parent.display()
                )
            })?;
            copy_entry(&source, &dest.join(relative), options, &mut report)?;
        }

        tracing::debug!(
            prefix = "copy",
            "{} -> {}: {} files, {} dirs",
            pattern.display(),
            dest.display(),
            report.files,
            report.dirs
        );
        Ok(report)
    }
}

fn copy_entry(
    source: &Path,
    target: &Path,
    options: &CopyOptions,
    report: &mut CopyReport,
) -> anyhow::Result<()> {
    let metadata = if options.dereference {
        fs::metadata(source)
    } else {
        fs::symlink_metadata(source)
    }
    .with_context(|| format!("Failed to stat {}", source.display()))?;

    if metadata.file_type().is_symlink() {
        return copy_link(source, target, report);
    }

    if metadata.is_dir() {
        if options.include_empty_dirs {
            fs::create_dir_all(target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
            report.dirs += 1;
        }
        return Ok(());
    }

    if options.update && is_up_to_date(&metadata, target) {
        report.skipped += 1;
        return Ok(());
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(source, target).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            target.display()
        )
    })?;

    if options.preserve {
        filetime::set_file_times(
            target,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )
        .with_context(|| format!("Failed to preserve times on {}", target.display()))?;
    }

    report.files += 1;
    Ok(())
}

#[cfg(unix)]
fn copy_link(source: &Path, target: &Path, report: &mut CopyReport) -> anyhow::Result<()> {
    let link = fs::read_link(source)
        .with_context(|| format!("Failed to read link: {}", source.display()))?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target)
            .with_context(|| format!("Failed to replace {}", target.display()))?;
    }
    std::os::unix::fs::symlink(&link, target)
        .with_context(|| format!("Failed to create link: {}", target.display()))?;
    report.files += 1;
    Ok(())
}

#[cfg(not(unix))]
fn copy_link(source: &Path, target: &Path, report: &mut CopyReport) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(source, target).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            target.display()
        )
    })?;
    report.files += 1;
    Ok(())
}

fn is_up_to_date(source: &Metadata, target: &Path) -> bool {
    let (Ok(source_time), Ok(target_time)) = (
        source.modified(),
        fs::metadata(target).and_then(|m| m.modified()),
    ) else {
        return false;
    };
    target_time >= source_time
}

/// Remove files under `dest` matching the pattern's relative part.
fn clean_destination(dest: &Path, relative_pattern: &Path) -> anyhow::Result<usize> {
    let pattern = dest.join(relative_pattern);
    let pattern_str = path_str(&pattern)?;
    let mut removed = 0;
    for entry in glob::glob(pattern_str)
        .with_context(|| format!("Invalid glob pattern: {}", pattern_str))?
    {
        let path = entry.context("Failed to read glob match")?;
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn path_str(path: &Path) -> anyhow::Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Path is not valid UTF-8: {}", path.display()))
}

/// Drop `.` segments and fold `..` into the preceding segment.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `dir/**` matches directories only in `glob`; widen it to `dir/**/*` so
/// the files below are matched too.
pub(crate) fn expand_trailing_globstar(pattern: PathBuf) -> PathBuf {
    if pattern.file_name().is_some_and(|last| last == "**") {
        pattern.join("*")
    } else {
        pattern
    }
}

/// Leading segments without wildcards; the parent directory for a literal path.
pub(crate) fn static_parent(pattern: &Path) -> PathBuf {
    let mut parent = PathBuf::new();
    for component in pattern.components() {
        if let Component::Normal(segment) = component
            && has_glob_meta(&segment.to_string_lossy())
        {
            return parent;
        }
        parent.push(component.as_os_str());
    }
    pattern.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn opts() -> CopyOptions {
        CopyOptions {
            include_empty_dirs: true,
            ..CopyOptions::default()
        }
    }

    #[test]
    fn normalize_folds_navigation() {
        assert_eq!(
            normalize_lexically(Path::new("/p/./site/../src/**")),
            Path::new("/p/src/**")
        );
        assert_eq!(normalize_lexically(Path::new("../a/./b")), Path::new("../a/b"));
        assert_eq!(normalize_lexically(Path::new("/..")), Path::new("/"));
    }

    #[test]
    fn static_parent_stops_at_wildcards() {
        assert_eq!(static_parent(Path::new("/p/dist/**/*.js")), Path::new("/p/dist"));
        assert_eq!(static_parent(Path::new("/p/dist/*.{js,css}")), Path::new("/p/dist"));
        assert_eq!(static_parent(Path::new("/p/README.md")), Path::new("/p"));
    }

    #[test]
    fn trailing_globstar_also_matches_files() {
        assert_eq!(
            expand_trailing_globstar(PathBuf::from("/p/dist/**")),
            Path::new("/p/dist/**/*")
        );
        assert_eq!(
            expand_trailing_globstar(PathBuf::from("/p/dist/**/*.js")),
            Path::new("/p/dist/**/*.js")
        );
        assert_eq!(
            expand_trailing_globstar(PathBuf::from("/p/README.md")),
            Path::new("/p/README.md")
        );
    }

    #[test]
    fn copies_matches_relative_to_static_parent() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("dist");
        write(&src.join("index.html"), "<html>");
        write(&src.join("js/app.js"), "app");
        fs::create_dir_all(src.join("empty")).unwrap();
        let dest = temp.path().join("out");

        let pattern = format!("{}/**", src.display());
        let report = GlobCopyEngine.copy(&pattern, &dest, &opts()).unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(fs::read_to_string(dest.join("index.html")).unwrap(), "<html>");
        assert_eq!(fs::read_to_string(dest.join("js/app.js")).unwrap(), "app");
        assert!(dest.join("empty").is_dir());
    }

    #[test]
    fn empty_dirs_are_skipped_without_include_flag() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("dist");
        fs::create_dir_all(src.join("empty")).unwrap();
        write(&src.join("a.txt"), "a");
        let dest = temp.path().join("out");

        let pattern = format!("{}/**", src.display());
        GlobCopyEngine
            .copy(&pattern, &dest, &CopyOptions::default())
            .unwrap();

        assert!(dest.join("a.txt").is_file());
        assert!(!dest.join("empty").exists());
    }

    #[test]
    fn literal_file_lands_in_dest() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("README.md"), "readme");
        let dest = temp.path().join("out");

        let pattern = temp.path().join("README.md");
        let report = GlobCopyEngine
            .copy(pattern.to_str().unwrap(), &dest, &opts())
            .unwrap();

        assert_eq!(report.files, 1);
        assert!(dest.join("README.md").is_file());
    }

    #[test]
    fn clean_removes_stale_matches_first() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("dist");
        write(&src.join("new.js"), "new");
        let dest = temp.path().join("out");
        write(&dest.join("old.js"), "old");
        write(&dest.join("keep.txt"), "keep");

        let pattern = format!("{}/*.js", src.display());
        let options = CopyOptions {
            clean: true,
            ..opts()
        };
        let report = GlobCopyEngine.copy(&pattern, &dest, &options).unwrap();

        assert_eq!(report.removed, 1);
        assert!(!dest.join("old.js").exists());
        assert!(dest.join("new.js").is_file());
        assert!(dest.join("keep.txt").is_file());
    }

    #[test]
    fn clean_with_trailing_globstar_removes_nested_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("dist");
        write(&src.join("index.html"), "<html>");
        let dest = temp.path().join("out");
        write(&dest.join("js/stale.js"), "old");

        let pattern = format!("{}/**", src.display());
        let options = CopyOptions {
            clean: true,
            ..opts()
        };
        let report = GlobCopyEngine.copy(&pattern, &dest, &options).unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.files, 1);
        assert!(!dest.join("js/stale.js").exists());
        assert!(dest.join("index.html").is_file());
    }

    #[test]
    fn update_skips_newer_targets() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("dist");
        write(&src.join("a.txt"), "source");
        let dest = temp.path().join("out");
        write(&dest.join("a.txt"), "target");
        let future = FileTime::from_unix_time(4_000_000_000, 0);
        filetime::set_file_mtime(dest.join("a.txt"), future).unwrap();

        let pattern = format!("{}/*.txt", src.display());
        let options = CopyOptions {
            update: true,
            ..opts()
        };
        let report = GlobCopyEngine.copy(&pattern, &dest, &options).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "target");
    }

    #[test]
    fn preserve_keeps_modification_time() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("dist");
        write(&src.join("a.txt"), "a");
        let past = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(src.join("a.txt"), past).unwrap();
        let dest = temp.path().join("out");

        let pattern = format!("{}/*.txt", src.display());
        let options = CopyOptions {
            preserve: true,
            ..opts()
        };
        GlobCopyEngine.copy(&pattern, &dest, &options).unwrap();

        let copied = fs::metadata(dest.join("a.txt")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&copied), past);
    }
}
