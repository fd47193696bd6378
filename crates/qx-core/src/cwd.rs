//! Scoped change of the process working directory.

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Changes the process working directory and restores the previous one when
/// dropped, including on early returns and unwinding.
///
/// The working directory is process-wide state; only the outermost command
/// should hold one of these.
#[derive(Debug)]
#[must_use = "the previous directory is restored when the guard drops"]
pub struct CwdGuard {
    previous: Option<PathBuf>,
}

impl CwdGuard {
    pub fn enter(path: &Path) -> anyhow::Result<Self> {
        let previous = std::env::current_dir().ok();
        std::env::set_current_dir(path)
            .with_context(|| format!("Failed to enter {}", path.display()))?;
        tracing::debug!(prefix = "cwd", "enter {}", path.display());
        Ok(Self { previous })
    }

    /// Restore now instead of at end of scope.
    pub fn leave(self) {}
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        match std::env::set_current_dir(&previous) {
            Ok(()) => tracing::debug!(prefix = "cwd", "leave {}", previous.display()),
            Err(err) => tracing::warn!(
                prefix = "cwd",
                "Failed to restore working directory {}: {}",
                previous.display(),
                err
            ),
        }
    }
}
