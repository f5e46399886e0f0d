//! Incremental build state for a TypeScript-like compiler.
//!
//! Across successive compilations of a multi-file program, this crate tracks
//! which files changed shape, which files depend on which, and which files
//! therefore require re-validation or re-emission. The aggregate
//! [`BuilderState`] is rebuilt for every compiled program (optionally
//! adopting unchanged parts of its predecessor) and answers the one question
//! the surrounding build driver asks: given that this file changed, which
//! files' previously-emitted output may now be stale?
//!
//! Change detection is signature-based: a file's externally observable shape
//! is the hash of its declaration-emit text, so an edit confined to a
//! function body does not ripple to dependents even though the file's
//! version changed.

pub mod file_info;
pub mod host;
pub mod path_map;
pub mod references;
pub mod signature;
pub mod state;
pub mod testing;

pub use file_info::{FileInfo, SignatureInfo};
pub use host::{BuildHost, DefaultBuildHost};
pub use path_map::ManyToManyPathMap;
pub use references::get_referenced_files;
pub use state::{BuilderState, EmitMode};
