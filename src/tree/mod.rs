//! Tree snapshots
//!
//! Turns real directories into FileStates and provides the relative-path helpers the
//! state algebra is keyed on.

pub mod path;
pub mod walker;

pub use walker::{file_state_from_tree, file_state_from_tree_with, Walker, WalkerConfig};
