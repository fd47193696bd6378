//! Source glob to destination path resolution.

use std::path::{Component, Path, PathBuf, is_separator};

use crate::config::CopySourceSpec;

/// A copy source with its base settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub glob: String,
    pub base: String,
}

/// Settle the base of a copy source.
///
/// Structured specs pass through unchanged (a missing base is empty). For a
/// plain glob the base is the prefix up to and including the first concrete
/// segment, skipping leading `.`, `..` and empty segments:
/// `./../src/**/*.scss` has base `./../src`, `dist/**` has base `dist`. When
/// that first concrete segment is itself a pattern (`**/*.js`) or there is
/// none, the base is empty.
pub fn resolve_source_path(spec: &CopySourceSpec) -> ResolvedSource {
    match spec {
        CopySourceSpec::Structured(source) => ResolvedSource {
            glob: source.glob.clone(),
            base: source.base.clone().unwrap_or_default(),
        },
        CopySourceSpec::Glob(glob) => ResolvedSource {
            glob: glob.clone(),
            base: glob_base(glob),
        },
    }
}

fn glob_base(glob: &str) -> String {
    let mut end = 0;
    for segment in glob.split(is_separator) {
        let segment_end = end + segment.len();
        match segment {
            "" | "." | ".." => {}
            concrete if has_glob_meta(concrete) => return String::new(),
            _ => return glob[..segment_end].to_string(),
        }
        // Skip past the separator as well.
        end = segment_end + 1;
    }
    String::new()
}

pub(crate) fn has_glob_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Where matches of a source with `base` land under `dest_root`.
///
/// Only the concrete segments of the base are kept, so navigation in the base
/// (`./../src`) can never move the target outside `dest_root`.
pub fn effective_destination(dest_root: &Path, base: &str) -> PathBuf {
    let concrete: PathBuf = Path::new(base)
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect();
    dest_root.join(concrete)
}
