//! Reusable units of work composed by commands.
//!
//! A step is configured once with [`SubCommand::initialize`], can be checked
//! with [`SubCommand::validate`], and performs its side effect in
//! [`SubCommand::execute`]. Steps are owned by value by the command that runs
//! them; collaborators (VCS, copy engine, bumper) are injected at construction.

pub mod copy;
pub mod prune;
pub mod release;

pub use copy::{CopyConfig, CopyStep};
pub use prune::{PruneConfig, PruneDevDepsStep};
pub use release::{ReleaseConfig, ReleaseContext, ReleaseStep, WorkTree};

use crate::error::ValidationError;

#[allow(async_fn_in_trait)]
pub trait SubCommand {
    type Config;
    type Input;
    type Output;

    /// Store the configuration and mark the step ready.
    fn initialize(&mut self, config: Self::Config);

    fn is_initialized(&self) -> bool;

    /// Reject malformed configuration before any side effect.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Fails with a [`ValidationError`] when called before `initialize`.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<Self::Output>;

    /// Log prefix.
    fn name(&self) -> String {
        step_name::<Self>()
    }
}

/// `qx_core::steps::copy::CopyStep` -> `copy`.
pub fn step_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    let short = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    short.strip_suffix("Step").unwrap_or(short).to_lowercase()
}

/// Run synchronous process or filesystem work off the async worker threads.
pub(crate) async fn run_blocking<T, F>(work: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    use anyhow::Context;

    tokio::task::spawn_blocking(work)
        .await
        .context("Blocking task failed to complete")?
}

pub(crate) fn not_initialized(name: &str) -> ValidationError {
    ValidationError::new(name, "Command is not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ArchiveStep;
    struct Generic<T>(T);

    #[tokio::test]
    async fn blocking_work_returns_its_result() {
        assert_eq!(run_blocking(|| Ok(7)).await.unwrap(), 7);
        let err = run_blocking(|| -> anyhow::Result<()> { anyhow::bail!("boom") })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn step_names_drop_path_and_suffix() {
        assert_eq!(step_name::<CopyStep>(), "copy");
        assert_eq!(step_name::<ReleaseStep>(), "release");
        assert_eq!(step_name::<PruneDevDepsStep>(), "prunedevdeps");
        assert_eq!(step_name::<ArchiveStep>(), "archive");
        assert_eq!(step_name::<Generic<ArchiveStep>>(), "generic");
    }
}
