//! Properties of realizing FileStates on disk

use super::{spec_strategy, Bodies};
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use tempfile::TempDir;
use treebisect::fileio::FileIo;
use treebisect::tree::file_state_from_tree;

fn disk_runner() -> TestRunner {
    TestRunner::new(Config::with_cases(48))
}

/// Applying a state twice leaves the same tree as applying it once
#[test]
fn test_apply_is_idempotent() {
    let bodies = Bodies::new();
    let io = FileIo::new();

    disk_runner()
        .run(&spec_strategy(), |spec| {
            let state = bodies.state(&spec);
            let temp = TempDir::new().unwrap();
            let root = temp.path().join("tree");
            io.ensure_dir_exists(&root).unwrap();

            state.apply(&io, &root).unwrap();
            let once = file_state_from_tree(&root).unwrap();
            state.apply(&io, &root).unwrap();
            let twice = file_state_from_tree(&root).unwrap();

            prop_assert!(once.same_content_as(&twice));
            prop_assert!(once.same_content_as(&state.without_empty_entries()));
            Ok(())
        })
        .unwrap();
}

/// The transition delta moves a workspace holding `full` to `full.merged_with(change)`,
/// pruning directories that lose their last entry
#[test]
fn test_transition_delta_reaches_merged_state() {
    let bodies = Bodies::new();
    let io = FileIo::new();

    disk_runner()
        .run(&(spec_strategy(), spec_strategy()), |(full, change)| {
            let full = bodies.state(&full).without_empty_entries();
            let change = bodies.state(&change);
            let temp = TempDir::new().unwrap();
            let root = temp.path().join("tree");
            io.ensure_dir_exists(&root).unwrap();

            full.apply(&io, &root).unwrap();
            full.transition_delta(&change).apply(&io, &root).unwrap();

            let expected = full.merged_with(&change).without_empty_entries();
            let actual = file_state_from_tree(&root).unwrap();
            prop_assert!(actual.same_content_as(&expected));
            Ok(())
        })
        .unwrap();
}
