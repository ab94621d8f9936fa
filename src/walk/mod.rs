// src/walk/mod.rs
// =============================================================================
// This module discovers markdown files and hands their content downstream.
//
// Two kinds of target:
// - a single file, which must have a .md extension
// - a directory, walked recursively; every .md file under it is read
//
// The walk runs on a blocking thread and pushes each file into a bounded
// channel as soon as it has been read, so probing starts while the tree is
// still being enumerated. Traversal is all-or-nothing: the first permission
// error or vanished entry ends the walk and comes back as a hard error.
// =============================================================================

mod tree;

pub use tree::{spawn_walker, MarkdownFile, WalkTarget, FILE_QUEUE_CAPACITY};
