//! Properties of the diff/merge operations on FileState

use super::{spec_strategy, Bodies};
use proptest::prelude::*;
use proptest::test_runner::TestRunner;

/// Expanding both sides and taking the other's conflicts reproduces the other side.
///
/// Only holds while neither state uses a key the other implies as a directory; the
/// expansion skips such keys, so colliding trees go through `changes_toward` instead.
#[test]
fn test_diff_merge_round_trip() {
    let bodies = Bodies::new();
    let mut runner = TestRunner::default();

    runner
        .run(&(spec_strategy(), spec_strategy()), |(a, b)| {
            let a = bodies.state(&a);
            let b = bodies.state(&b);

            let combined = a
                .expanded_with_empty_entries_for(&b)
                .with_conflicts_from(&b.expanded_with_empty_entries_for(&a), false);
            prop_assert!(combined.same_content_as(&b.expanded_with_empty_entries_for(&a)));
            prop_assert!(combined.same_content_as(&b));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_merge_prefers_the_change() {
    let bodies = Bodies::new();
    let mut runner = TestRunner::default();

    runner
        .run(&(spec_strategy(), spec_strategy()), |(a, b)| {
            let a = bodies.state(&a);
            let b = bodies.state(&b);
            let merged = a.merged_with(&b);

            for (key, content) in b.iter() {
                prop_assert!(merged.get(key).is_some_and(|m| m.equals(content)));
            }
            for (key, content) in a.iter() {
                if !b.contains(key) {
                    prop_assert!(merged.get(key).is_some_and(|m| m.equals(content)));
                }
            }
            Ok(())
        })
        .unwrap();
}

/// Dropping entries that already match does not change the merge result
#[test]
fn test_duplicates_do_not_affect_merge() {
    let bodies = Bodies::new();
    let mut runner = TestRunner::default();

    runner
        .run(&(spec_strategy(), spec_strategy()), |(a, b)| {
            let a = bodies.state(&a);
            let b = bodies.state(&b);

            let changes = b.without_duplicates_from(&a);
            prop_assert!(a.merged_with(&changes).same_content_as(&a.merged_with(&b)));
            for (key, content) in changes.iter() {
                prop_assert!(!a.get(key).is_some_and(|theirs| theirs.equals(content)));
            }
            Ok(())
        })
        .unwrap();
}

/// Splitting partitions the entries; anything with two or more entries really splits
#[test]
fn test_split_once_partitions_entries() {
    let bodies = Bodies::new();
    let mut runner = TestRunner::default();

    runner
        .run(&spec_strategy(), |spec| {
            let state = bodies.state(&spec);
            let parts = state.split_once();

            let total: usize = parts.iter().map(|part| part.size()).sum();
            prop_assert_eq!(total, state.size());
            prop_assert!(parts.iter().all(|part| !part.is_empty()) || state.is_empty());
            if state.size() >= 2 {
                prop_assert!(parts.len() >= 2);
            }

            let rejoined = parts
                .iter()
                .fold(treebisect::state::FileState::new(), |acc, part| acc.merged_with(part));
            prop_assert!(rejoined.same_content_as(&state));
            Ok(())
        })
        .unwrap();
}

/// Removing an accepted subset leaves exactly the rest
#[test]
fn test_accepting_a_split_shrinks_target() {
    let bodies = Bodies::new();
    let mut runner = TestRunner::default();

    runner
        .run(&spec_strategy(), |spec| {
            let target = bodies.state(&spec);
            for accepted in target.split_once() {
                let rest = target.without_entries_in(&accepted);
                prop_assert_eq!(rest.size() + accepted.size(), target.size());
                prop_assert!(rest.common_entries_with(&accepted).is_empty());
            }
            Ok(())
        })
        .unwrap();
}
