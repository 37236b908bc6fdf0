//! Integration tests for turning directory trees into FileStates and back

use crate::integration::{tree_contents, write_tree};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use treebisect::fileio::FileIo;
use treebisect::state::{Content, FileState};
use treebisect::tree::file_state_from_tree;

#[test]
fn test_snapshot_keys_are_sorted_and_relative() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("tree");
    write_tree(
        &root,
        &[("z.txt", "z"), ("a/b/c.txt", "c"), ("a/a.txt", "a"), ("m.txt", "m")],
    );

    let state = file_state_from_tree(&root).unwrap();
    let keys: Vec<&str> = state.keys().collect();
    assert_eq!(keys, vec!["a/a.txt", "a/b/c.txt", "m.txt", "z.txt"]);
}

#[test]
fn test_snapshot_references_absolute_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("tree");
    write_tree(&root, &[("dir/file.txt", "hello")]);

    let state = file_state_from_tree(&root).unwrap();
    match state.get("dir/file.txt") {
        Some(Content::FileBacked(reference)) => {
            assert!(reference.is_absolute());
            assert_eq!(fs::read_to_string(reference).unwrap(), "hello");
        }
        other => panic!("expected file-backed content, got {:?}", other),
    }
}

#[test]
fn test_only_leaf_empty_directories_are_recorded() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("tree");
    write_tree(&root, &[("full/f.txt", "f")]);
    fs::create_dir_all(root.join("outer/inner")).unwrap();

    let state = file_state_from_tree(&root).unwrap();
    assert!(matches!(state.get("outer/inner"), Some(Content::EmptyDirectory)));
    assert!(state.get("outer").is_none());
    assert!(state.get("full").is_none());
    assert_eq!(state.size(), 2);
}

#[test]
fn test_snapshot_applied_elsewhere_reproduces_tree() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let copy = temp.path().join("copy");
    write_tree(&source, &[("a.txt", "1"), ("sub/b.txt", "2")]);
    fs::create_dir_all(source.join("empty")).unwrap();

    let state = file_state_from_tree(&source).unwrap();
    state.apply(&FileIo::new(), &copy).unwrap();

    assert_eq!(tree_contents(&source), tree_contents(&copy));
    assert!(copy.join("empty").is_dir());
    assert!(file_state_from_tree(&copy).unwrap().same_content_as(&state));
}

#[test]
fn test_delta_between_snapshots_turns_one_tree_into_the_other() {
    let temp = TempDir::new().unwrap();
    let before = temp.path().join("before");
    let after = temp.path().join("after");
    let work = temp.path().join("work");
    write_tree(&before, &[("keep.txt", "k"), ("gone/x.txt", "x"), ("edit.txt", "old")]);
    write_tree(&after, &[("keep.txt", "k"), ("edit.txt", "new"), ("added/y.txt", "y")]);

    let io = FileIo::new();
    let before_state = file_state_from_tree(&before).unwrap();
    let after_state = file_state_from_tree(&after).unwrap();
    before_state.apply(&io, &work).unwrap();

    let change = before_state.changes_toward(&after_state);
    before_state
        .transition_delta(&change)
        .apply(&io, &work)
        .unwrap();

    assert_eq!(tree_contents(&work), tree_contents(&after));
    assert!(!work.join("gone").exists());
}

#[test]
fn test_missing_tree_is_an_error() {
    let temp = TempDir::new().unwrap();
    assert!(file_state_from_tree(&temp.path().join("absent")).is_err());
}

#[test]
fn test_apply_refuses_shallow_roots() {
    let state: FileState = [("a.txt".to_string(), Content::Missing)].into_iter().collect();
    assert!(state.apply(&FileIo::new(), Path::new("/tmp")).is_err());
}
