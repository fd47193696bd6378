//! Top-level commands run through the [`Lifecycle`](crate::lifecycle::Lifecycle).

pub mod bump;
pub mod deploy;

pub use bump::{BumpCommand, BumpReport};
pub use deploy::{DEMO_FOLDER_CHOICES, DeployCommand, DeployReport, DeployServices};
