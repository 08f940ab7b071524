//! Commit history
//!
//! - `history`: ancestor walks, merge bases and ancestry checks
//! - `bisect`: binary search for the first bad commit
//!
//! Walks pop commits from a priority queue keyed by committer time, so the order is
//! deterministic for a fixed graph: newest first, ties broken by object ID.

pub mod bisect;
pub mod history;
