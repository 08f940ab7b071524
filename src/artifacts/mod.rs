//! Data structures and algorithms
//!
//! - `branch`: ref names and revision expressions
//! - `checkout`: working-tree migration and local-change detection
//! - `core`: shared utilities (time source)
//! - `database`: tree entries and flattened tree listings
//! - `diff`: tree-to-tree comparison
//! - `index`: index entries, stages and the index file format
//! - `log`: history walks, merge bases and bisect
//! - `merge`: merge bases, line and tree three-way merges, pending merge state
//! - `objects`: blob, tree, commit and tag objects and their hashing
//! - `rebase`: todo lists and suspended rebases
//! - `status`: HEAD, index and working-tree comparison

pub mod branch;
pub mod checkout;
pub mod core;
pub mod database;
pub mod diff;
pub mod index;
pub mod log;
pub mod merge;
pub mod objects;
pub mod rebase;
pub mod status;
