//! Working tree status
//!
//! - `file_change`: change kinds and their short/long labels
//! - `inspector`: compares a single path across HEAD, the index and the working tree
//! - `status_info`: the full report for a repository

pub mod file_change;
pub mod inspector;
pub mod status_info;
