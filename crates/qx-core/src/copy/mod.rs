pub mod engine;
pub mod resolve;

pub use engine::{CopyEngine, CopyReport, GlobCopyEngine};
pub use resolve::{ResolvedSource, effective_destination, resolve_source_path};
