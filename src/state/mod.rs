//! File state algebra
//!
//! Immutable path-to-content mappings that describe (partial) directory trees and the
//! deltas between them. Nothing here touches disk until `apply` is called.

pub mod content;
pub mod file_state;

pub use content::Content;
pub use file_state::FileState;
