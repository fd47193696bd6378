//! Project configuration: discovery, the loaded document, and option layering.
//!
//! - [`ConfigResolver`] finds `qxjs.config.{js,json,toml}` or the `qxjs` section
//!   of `package.json` in a directory or its ancestors.
//! - [`ProjectConfig`] is the immutable loaded document plus its root.
//! - [`OptionLayers`] merges argv, the command section, the root config and
//!   environment defaults into [`CommandOptions`].

pub mod options;
pub mod project;
pub mod resolver;
pub mod schema;

pub use options::{CommandOptions, OptionLayers, OptionMap};
pub use project::ProjectConfig;
pub use resolver::{ConfigResolver, SEARCH_PLACES};
pub use schema::{CopyOptions, CopySourceSpec, DeployExtras, ReleaseSettings, SourceGlob};
