//! treebisect: Directory Tree Bisection
//!
//! Given a directory tree on which a command passes, a tree on which it fails, and the
//! command itself, finds a large set of file differences that can be carried from the
//! failing tree onto the passing tree while the command keeps passing. What remains
//! is a small residue of differences that the failure depends on.
//!
//! File content is opaque: only existence, bytes, and directory-ness matter.

pub mod cli;
pub mod config;
pub mod error;
pub mod fileio;
pub mod hyperbox;
pub mod logging;
pub mod report;
pub mod runner;
pub mod search;
pub mod state;
pub mod tree;
