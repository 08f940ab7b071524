//! Porcelain: the operations a user drives
//!
//! Each file adds one group of methods to [`Repository`]:
//!
//! - `add`: stage, unstage and remove paths
//! - `commit`: commit and amend, concluding pending merges
//! - `status`, `log`, `reflog`: read-only views
//! - `branch`, `tag`: ref management
//! - `checkout`: switch HEAD and migrate the working tree
//! - `merge`: fast-forward and three-way merges, abort and continue
//! - `cherry_pick`, `revert`: replay one commit's change, or its inverse
//! - `reset`: soft, mixed and hard
//! - `rebase`: replay a todo list onto a new base
//! - `stash`: save, apply and drop work in progress
//! - `bisect`: search for the first bad commit
//!
//! [`Repository`]: crate::areas::repository::Repository

pub mod add;
pub mod bisect;
pub mod branch;
pub mod checkout;
pub mod cherry_pick;
pub mod commit;
pub mod log;
pub mod merge;
pub mod rebase;
pub mod reflog;
pub mod reset;
pub mod revert;
pub mod stash;
pub mod status;
pub mod tag;
