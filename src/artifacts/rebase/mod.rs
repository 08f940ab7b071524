//! Rebase sequencing
//!
//! A rebase replays a [`RebasePlan`] one item at a time on a detached HEAD. When a step
//! stops (a conflict, or an `edit` item) the remaining work is handed back as a
//! [`SuspendedRebase`] value; the caller keeps it, resolves, and passes it to
//! `rebase_continue` or `rebase_abort`. The branch ref itself only moves once, when the
//! last item has been replayed.

pub mod todo;

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rebase::todo::TodoItem;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use todo::{RebasePlan, TodoAction};

/// Where the command line keeps a suspended rebase between invocations
pub const REBASE_STATE_FILE: &str = "REBASE_STATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Conflict,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseStop {
    pub reason: StopReason,
    pub item: TodoItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendedRebase {
    /// Full name of the branch being rebased
    pub branch: String,
    /// Branch tip before the rebase; abort restores it
    pub orig_head: ObjectId,
    pub onto: ObjectId,
    /// Last replayed commit
    pub tip: ObjectId,
    pub stopped: Option<RebaseStop>,
    pub remaining: Vec<TodoItem>,
}

impl SuspendedRebase {
    pub fn path(git_dir: &Path) -> PathBuf {
        git_dir.join(REBASE_STATE_FILE)
    }

    pub fn load(git_dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = Self::path(git_dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let suspended = toml::from_str(&content)
            .with_context(|| format!("Malformed rebase state in {}", path.display()))?;

        Ok(Some(suspended))
    }

    pub fn save(&self, git_dir: &Path) -> anyhow::Result<()> {
        let path = Self::path(git_dir);
        let temp_path = path.with_extension("tmp");
        let content = toml::to_string(self).context("Unable to serialize rebase state")?;

        std::fs::write(&temp_path, content)
            .with_context(|| format!("Unable to write {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Unable to move rebase state into {}", path.display()))
    }

    pub fn clear(git_dir: &Path) -> anyhow::Result<()> {
        let path = Self::path(git_dir);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Unable to remove {}", path.display()))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// The branch now points at the new tip
    Completed(ObjectId),
    /// The branch already contains the target; nothing moved
    UpToDate,
    Paused(SuspendedRebase),
}
