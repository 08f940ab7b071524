//! Durable and mutable parts of a repository
//!
//! - `config`: `.twig/config.toml`
//! - `database`: content-addressed object store
//! - `hooks`: callbacks consulted before and after commits
//! - `index`: staging area
//! - `lock`: repository-wide advisory lock
//! - `reflog`: append-only history of every ref
//! - `refs`: branches, tags, HEAD and ORIG_HEAD
//! - `repository`: ties the areas together
//! - `stash`: stack of stashed work-in-progress commits
//! - `workspace`: working-directory adapters (disk and in-memory)

pub mod config;
pub mod database;
pub mod hooks;
pub mod index;
pub mod lock;
pub mod reflog;
pub mod refs;
pub mod repository;
pub mod stash;
pub mod workspace;
