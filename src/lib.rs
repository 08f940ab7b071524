//! twig: a small content-addressable version control engine
//!
//! The crate is organised the same way as the on-disk repository it manages:
//!
//! - `areas`: the mutable and durable parts of a repository (object database, index,
//!   refs and reflogs, working-directory adapters, configuration, locking)
//! - `artifacts`: data structures and algorithms (objects, index entries, revisions,
//!   tree diffs, merge-base finding, three-way merging, rebase sequencing)
//! - `commands`: repository operations, split into plumbing and porcelain
//! - `errors`: the error taxonomy surfaced to callers

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
