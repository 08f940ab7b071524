//! Shared utilities
//!
//! - `clock`: time source for commit, committer and reflog timestamps

pub mod clock;
