//! Repository operations
//!
//! - `plumbing`: direct access to objects (hashing, inspection, commit objects, gc, fsck)
//! - `porcelain`: user-facing workflows built on top of the plumbing
//!
//! Operations are inherent methods on `Repository`, one file per command.

pub mod plumbing;
pub mod porcelain;
