//! Plumbing: direct access to the object store
//!
//! - `hash_object`: hash (and optionally store) content as a blob
//! - `cat_file`: parse any stored object
//! - `ls_tree`: flatten a tree
//! - `commit_tree`: write the index as a tree, create commit objects
//! - `gc`: drop unreachable objects
//! - `fsck`: verify stored objects and ref reachability

pub mod cat_file;
pub mod commit_tree;
pub mod fsck;
pub mod gc;
pub mod hash_object;
pub mod ls_tree;
