//! Working-tree migration
//!
//! Moving the working tree from one tree to another (checkout, merges, reset, stash) is
//! done in two steps:
//!
//! 1. Plan: record a write or removal for every changed path and check that none of them
//!    would destroy local work.
//! 2. Apply: perform the planned writes through the [`Workspace`] adapter.
//!
//! ## Conflict detection
//!
//! - Stale files: the index or the working copy differs from both trees
//! - Stale directories: a directory holding untracked files sits where a file must go
//! - Untracked overwrites: an untracked file sits where a tracked file must go
//! - Untracked removals: an untracked file sits where a tracked file is being deleted
//!
//! Every check runs before anything is written, so a refused migration changes nothing.

use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::workspace::Workspace;
use crate::artifacts::checkout::conflict::ConflictType;
use crate::artifacts::database::TreeListing;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::diff_listings;
use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::index::index_entry::parent_dirs;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::inspector::Inspector;
use crate::errors::RepositoryError;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// File system action planned for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Write { content: Bytes, mode: FileMode },
    Remove,
}

pub type ActionsSet = BTreeMap<PathBuf, Action>;
pub type ConflictsSet = BTreeMap<ConflictType, BTreeSet<PathBuf>>;

pub struct Migration<'r> {
    database: &'r Database,
    workspace: &'r dyn Workspace,
    index: &'r Index,
    inspector: Inspector<'r>,
    actions: ActionsSet,
    conflicts: ConflictsSet,
}

impl<'r> Migration<'r> {
    pub fn new(database: &'r Database, workspace: &'r dyn Workspace, index: &'r Index) -> Self {
        Self {
            database,
            workspace,
            index,
            inspector: Inspector::new(database, workspace),
            actions: ActionsSet::new(),
            conflicts: ConflictsSet::new(),
        }
    }

    pub fn actions(&self) -> &ActionsSet {
        &self.actions
    }

    pub fn conflicts(&self) -> &ConflictsSet {
        &self.conflicts
    }

    /// Plan the move from `old` to `new`, checking each changed path
    pub fn plan_trees(&mut self, old: &TreeListing, new: &TreeListing) -> anyhow::Result<()> {
        for (path, change) in diff_listings(old, new) {
            let action = match change.after() {
                Some(entry) => self.write_action(entry)?,
                None => Action::Remove,
            };
            self.plan_file(&path, change.before(), change.after(), action)?;
        }

        Ok(())
    }

    /// Plan a single path whose current tree entry is `old_entry`
    ///
    /// `new_entry` is what the index will hold afterwards, if known; merge conflicts write
    /// marker content that has no entry of its own.
    pub fn plan_file(
        &mut self,
        path: &Path,
        old_entry: Option<&DatabaseEntry>,
        new_entry: Option<&DatabaseEntry>,
        action: Action,
    ) -> anyhow::Result<()> {
        let new_is_file = matches!(action, Action::Write { .. });
        self.check_for_conflict(path, old_entry, new_entry, new_is_file)?;
        self.actions.insert(path.to_path_buf(), action);

        Ok(())
    }

    /// Plan writes for every path of `listing` without any safety check
    pub fn force_trees(&mut self, old: &TreeListing, new: &TreeListing) -> anyhow::Result<()> {
        for path in old.keys().filter(|path| !new.contains_key(*path)) {
            self.actions.insert(path.clone(), Action::Remove);
        }
        for (path, entry) in new {
            let action = self.write_action(entry)?;
            self.actions.insert(path.clone(), action);
        }

        Ok(())
    }

    fn write_action(&self, entry: &DatabaseEntry) -> anyhow::Result<Action> {
        Ok(Action::Write {
            content: self.database.load_blob(&entry.oid)?.into_content(),
            mode: FileMode::try_from(entry.mode)?,
        })
    }

    /// Refuse with every blocked path listed, grouped by reason
    pub fn ensure_safe(&self, operation: &str) -> anyhow::Result<()> {
        let errors = self.collect_errors(operation);
        if errors.is_empty() {
            return Ok(());
        }

        tracing::info!(operation, blocked = errors.len(), "local changes block update");
        let errors = errors
            .iter()
            .map(|error| format!("error: {error}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        Err(RepositoryError::invalid_state(format!("{errors}\nAborting")))
    }

    fn collect_errors(&self, operation: &str) -> Vec<String> {
        self.conflicts
            .iter()
            .filter(|(_, paths)| !paths.is_empty())
            .map(|(conflict_type, paths)| conflict_type.report(operation, paths))
            .collect()
    }

    fn record_conflict(&mut self, conflict_type: ConflictType, path: &Path) {
        self.conflicts
            .entry(conflict_type)
            .or_default()
            .insert(path.to_path_buf());
    }

    fn check_for_conflict(
        &mut self,
        path: &Path,
        old_entry: Option<&DatabaseEntry>,
        new_entry: Option<&DatabaseEntry>,
        new_is_file: bool,
    ) -> anyhow::Result<()> {
        let entry = self.index.entry_by_path(path);

        if self.index.entries_for(path).len() > 1 {
            self.record_conflict(ConflictType::StaleFile, path);
            return Ok(());
        }

        let index_differs_from_trees = self.inspector.index_change(entry, old_entry)
            != IndexChangeType::None
            && self.inspector.index_change(entry, new_entry)
                != IndexChangeType::None;
        if index_differs_from_trees {
            self.record_conflict(ConflictType::StaleFile, path);
            return Ok(());
        }

        if self.workspace.is_file(path) {
            let workspace_change = self.inspector.workspace_change(entry, path)?;
            if workspace_change != WorkspaceChangeType::None {
                self.record_conflict(ConflictType::classify(entry, false, new_is_file), path);
            }
        } else if new_is_file && self.inspector.untracked_under(path, self.index)? {
            self.record_conflict(ConflictType::classify(entry, true, new_is_file), path);
        }

        if new_is_file && let Some(parent) = self.untracked_parent(path) {
            self.record_conflict(ConflictType::UntrackedOverwritten, parent);
        }

        Ok(())
    }

    fn untracked_parent<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        parent_dirs(path)
            .into_iter()
            .find(|parent| self.workspace.is_file(parent) && !self.index.is_tracked(parent))
    }

    /// Perform the planned actions, removals first
    pub fn apply(&self) -> anyhow::Result<()> {
        for (path, action) in &self.actions {
            if *action == Action::Remove {
                self.workspace.remove_file(path)?;
            }
        }

        for (path, action) in &self.actions {
            if let Action::Write { content, mode } = action {
                self.workspace.write_file(path, content, *mode)?;
            }
        }

        tracing::debug!(actions = self.actions.len(), "working tree migrated");
        Ok(())
    }
}
