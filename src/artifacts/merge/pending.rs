//! Durable record of an operation stopped on conflicts
//!
//! Merge, cherry-pick and revert write `.twig/MERGE_STATE` before touching the index, so
//! a later process can conclude them with `commit` or roll them back with `merge_abort`.

use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MERGE_STATE_FILE: &str = "MERGE_STATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingKind {
    Merge,
    CherryPick,
    Revert,
}

impl std::fmt::Display for PendingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingKind::Merge => write!(f, "merge"),
            PendingKind::CherryPick => write!(f, "cherry-pick"),
            PendingKind::Revert => write!(f, "revert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMerge {
    pub kind: PendingKind,
    /// HEAD before the operation started; abort returns here
    pub orig_head: ObjectId,
    /// Commit being merged, picked or reverted
    pub theirs: ObjectId,
    pub message: String,
    /// Original author, kept for cherry-picks; stored in object form
    pub author: Option<String>,
}

impl PendingMerge {
    pub fn path(git_dir: &Path) -> PathBuf {
        git_dir.join(MERGE_STATE_FILE)
    }

    pub fn load(git_dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = Self::path(git_dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let pending = toml::from_str(&content)
            .with_context(|| format!("Malformed merge state in {}", path.display()))?;

        Ok(Some(pending))
    }

    pub fn save(&self, git_dir: &Path) -> anyhow::Result<()> {
        let path = Self::path(git_dir);
        let temp_path = path.with_extension("tmp");
        let content = toml::to_string(self).context("Unable to serialize merge state")?;

        std::fs::write(&temp_path, content)
            .with_context(|| format!("Unable to write {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Unable to move merge state into {}", path.display()))
    }

    pub fn clear(git_dir: &Path) -> anyhow::Result<()> {
        let path = Self::path(git_dir);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Unable to remove {}", path.display()))?;
        }

        Ok(())
    }

    /// Parents of the commit that concludes this operation, given the current HEAD
    pub fn parents(&self, head: &ObjectId) -> Vec<ObjectId> {
        match self.kind {
            PendingKind::Merge => vec![head.clone(), self.theirs.clone()],
            PendingKind::CherryPick | PendingKind::Revert => vec![head.clone()],
        }
    }

    pub fn original_author(&self) -> anyhow::Result<Option<Author>> {
        self.author
            .as_deref()
            .map(Author::try_from)
            .transpose()
    }
}
