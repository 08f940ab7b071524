//! Moving the working tree between trees
//!
//! Used by checkout, merges, reset and stash. Every path is checked for local changes
//! before anything is written, so a refused migration leaves the working tree and the
//! index as they were.

pub mod conflict;
pub mod migration;
