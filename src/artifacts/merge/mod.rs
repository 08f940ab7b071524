//! Merge machinery
//!
//! - `bca_finder`: best common ancestors of two commits
//! - `diff3`: line-level three-way merge and conflict markers
//! - `resolve`: tree-level three-way merge
//! - `pending`: the on-disk record of a merge, cherry-pick or revert stopped on conflicts

pub mod bca_finder;
pub mod diff3;
pub mod pending;
pub mod resolve;
