use crate::areas::refs::Head;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::{STASH_REF_NAME, SymRefName};
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{IndexEntry, Stage};
use crate::artifacts::merge::diff3::ConflictLabels;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::status_info::Status;
use crate::commands::plumbing::commit_tree::normalize_message;
use crate::commands::porcelain::commit::ensure_resolved;
use crate::errors::RepositoryError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashApplyOutcome {
    Applied,
    /// The entry stays on the stack; resolve the paths by staging them
    Conflicted(Vec<PathBuf>),
}

impl Repository {
    /// Save staged and unstaged changes of tracked files, then reset them to HEAD
    ///
    /// The stash commit holds the working tree and has parents `[HEAD, index commit]`.
    /// Untracked files are neither saved nor touched.
    pub async fn stash_push(&self, message: Option<&str>) -> anyhow::Result<ObjectId> {
        let _lock = self.lock()?;
        self.ensure_no_pending_operation()?;

        let head = self.unborn_guard("stash")?;
        let head_listing = self.database().tree_listing(Some(&head))?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "stash")?;

        let status = Status::new(self.database(), self.workspace()).initialize(&index, &head_listing)?;
        if status.staged.is_empty() && status.unstaged.is_empty() {
            return Err(RepositoryError::invalid_state("no local changes to save"));
        }

        let mut worktree = index.listing();
        for path in status.unstaged.keys() {
            if self.workspace().is_file(path) {
                let oid = self.database().store(&self.workspace().parse_blob(path)?)?;
                let mode = self.workspace().file_mode(path)?;
                worktree.insert(path.clone(), DatabaseEntry::new(oid, mode.into()));
            } else {
                worktree.remove(path);
            }
        }

        let branch = match self.refs().head()? {
            Head::Attached(branch) => branch.short_name().to_string(),
            Head::Detached(_) => "(no branch)".to_string(),
        };
        let head_commit = self.database().load_commit(&head)?;
        let subject = format!("{branch}: {} {}", head.to_short_oid(), head_commit.short_message());
        let author = self.author()?;

        let index_commit = self.database().store(&Commit::new(
            vec![head.clone()],
            self.database().write_tree(&index.listing())?,
            author.clone(),
            normalize_message(&format!("index on {subject}")),
        ))?;
        let message = match message {
            Some(message) => format!("On {branch}: {message}"),
            None => format!("WIP on {subject}"),
        };
        let stash_oid = self.database().store(&Commit::new(
            vec![head, index_commit],
            self.database().write_tree(&worktree)?,
            author,
            normalize_message(&message),
        ))?;

        let stash_ref = SymRefName::new(STASH_REF_NAME.to_string());
        let previous = self.refs().read_ref(&stash_ref)?;
        self.refs()
            .update_ref(&stash_ref, &stash_oid, previous.as_ref(), &message)?;
        self.stash_stack().push(&stash_oid)?;

        let mut tracked = worktree;
        tracked.extend(index.listing());
        let mut migration = Migration::new(self.database(), self.workspace(), &index);
        migration.force_trees(&tracked, &head_listing)?;
        migration.apply()?;
        index.load_tree(&head_listing)?;
        index.write_updates()?;
        tracing::info!(stash = %stash_oid, "local changes stashed");

        Ok(stash_oid)
    }

    /// Stash entries, `stash@{0}` first
    pub fn stash_list(&self) -> anyhow::Result<Vec<(ObjectId, Commit)>> {
        self.stash_stack()
            .entries()?
            .into_iter()
            .map(|oid| {
                let commit = self.database().load_commit(&oid)?;
                Ok((oid, commit))
            })
            .collect()
    }

    /// Merge a stash entry into the working tree
    ///
    /// The HEAD the stash was taken on is the merge base. Modified files come back as
    /// unstaged changes; files the stash added are staged.
    pub async fn stash_apply(&self, position: usize) -> anyhow::Result<StashApplyOutcome> {
        let _lock = self.lock()?;
        self.ensure_no_pending_operation()?;

        let stash_oid = self.stash_stack().get(position)?;
        let stash = self.database().load_commit(&stash_oid)?;
        let head = self.unborn_guard("apply a stash")?;

        let base = self.database().tree_listing(stash.parent())?;
        let ours = self.database().tree_listing(Some(&head))?;
        let theirs = self.database().tree_listing(Some(&stash_oid))?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "apply a stash")?;

        let labels = ConflictLabels {
            ours: "Updated upstream".to_string(),
            base: "Stash base".to_string(),
            theirs: "Stashed changes".to_string(),
        };
        let tree_merge = self.resolve_trees(&base, &ours, &theirs, labels)?;
        let migration = self.plan_tree_merge(&index, &ours, &tree_merge, "stash apply")?;
        migration.apply()?;

        if !tree_merge.is_clean() {
            self.stage_tree_merge(&mut index, &ours, &tree_merge)?;
            index.write_updates()?;

            let conflicted = tree_merge.conflicts.keys().cloned().collect::<Vec<_>>();
            tracing::info!(conflicts = conflicted.len(), "stash applied with conflicts");
            return Ok(StashApplyOutcome::Conflicted(conflicted));
        }

        for (path, entry) in &tree_merge.resolved {
            if !ours.contains_key(path) {
                index.add(IndexEntry::conflicted(path.clone(), entry, Stage::Normal)?);
            }
        }
        index.write_updates()?;
        tracing::info!(stash = %stash_oid, "stash applied");

        Ok(StashApplyOutcome::Applied)
    }

    /// Apply a stash entry and drop it unless the apply conflicted
    pub async fn stash_pop(&self, position: usize) -> anyhow::Result<StashApplyOutcome> {
        let outcome = self.stash_apply(position).await?;
        if outcome == StashApplyOutcome::Applied {
            self.stash_drop(position)?;
        }

        Ok(outcome)
    }

    /// Remove a stash entry; the commit stays reachable through the reflog
    pub fn stash_drop(&self, position: usize) -> anyhow::Result<ObjectId> {
        let _lock = self.lock()?;

        let stack = self.stash_stack();
        let mut entries = stack.entries()?;
        let dropped = stack.get(position)?;
        entries.remove(position);

        let stash_ref = SymRefName::new(STASH_REF_NAME.to_string());
        let operation = format!("stash: drop stash@{{{position}}} ({})", dropped.to_short_oid());
        match (entries.first(), self.refs().read_ref(&stash_ref)?) {
            (Some(top), current) => {
                self.refs()
                    .update_ref(&stash_ref, top, current.as_ref(), &operation)?;
            }
            (None, Some(_)) => {
                self.refs().delete_ref(&stash_ref, &operation)?;
            }
            (None, None) => {}
        }
        stack.remove(position)?;

        Ok(dropped)
    }
}
