use crate::areas::config::FastForward;
use crate::areas::hooks::HookPoint;
use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::RefKind;
use crate::artifacts::checkout::migration::{Action, Migration};
use crate::artifacts::database::TreeListing;
use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::index::index_entry::{IndexEntry, Stage};
use crate::artifacts::log::history::History;
use crate::artifacts::merge::diff3::ConflictLabels;
use crate::artifacts::merge::pending::{PendingKind, PendingMerge};
use crate::artifacts::merge::resolve::{Resolve, TreeMerge};
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::plumbing::commit_tree::CommitRequest;
use crate::commands::porcelain::commit::ensure_resolved;
use crate::errors::RepositoryError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// `theirs` is already part of HEAD's history
    AlreadyUpToDate,
    /// HEAD moved to `theirs` without a merge commit
    FastForward(ObjectId),
    Merged(ObjectId),
    /// Merge in progress; resolve these paths, then `commit` or `merge_abort`
    Conflicted(Vec<PathBuf>),
}

impl Repository {
    /// Merge `revision` into HEAD
    ///
    /// Follows the configured fast-forward policy. A clean three-way merge is committed with
    /// parents `[HEAD, revision]`; otherwise the merge stays pending with conflict stages
    /// in the index and marker blocks in the working files.
    pub async fn merge(&self, revision: &str) -> anyhow::Result<MergeOutcome> {
        let _lock = self.lock()?;
        self.ensure_no_pending_operation()?;

        let theirs = self.resolve(revision)?;
        let policy = self.config().merge.fast_forward;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "merge")?;

        let theirs_listing = self.database().tree_listing(Some(&theirs))?;
        let fast_forward_message = format!("merge {revision}: Fast-forward");

        let Some(ours) = self.refs().read_head()? else {
            self.switch_trees(&mut index, &TreeListing::new(), &theirs_listing, "merge")?;
            index.write_updates()?;
            self.refs().update_head(&theirs, None, &fast_forward_message)?;
            return Ok(MergeOutcome::FastForward(theirs));
        };

        let base = History::from_database(self.database()).merge_base(&ours, &theirs)?;
        tracing::debug!(%ours, %theirs, base = ?base, "merge base found");

        if base.as_ref() == Some(&theirs) {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        let ours_listing = self.database().tree_listing(Some(&ours))?;
        if base.as_ref() == Some(&ours) && policy != FastForward::Never {
            self.switch_trees(&mut index, &ours_listing, &theirs_listing, "merge")?;
            index.write_updates()?;

            self.refs().set_orig_head(&ours)?;
            self.refs()
                .update_head(&theirs, Some(&ours), &fast_forward_message)?;
            tracing::info!(from = %ours, to = %theirs, "fast-forward");

            return Ok(MergeOutcome::FastForward(theirs));
        }
        if policy == FastForward::Only {
            return Err(RepositoryError::invalid_state(
                "not possible to fast-forward, aborting",
            ));
        }

        if base.is_none() {
            tracing::warn!(%ours, %theirs, "merging unrelated histories against an empty base");
        }
        let base_listing = self.database().tree_listing(base.as_ref())?;
        let labels = ConflictLabels {
            ours: "HEAD".to_string(),
            base: "merged common ancestors".to_string(),
            theirs: revision.to_string(),
        };
        let tree_merge = self.resolve_trees(&base_listing, &ours_listing, &theirs_listing, labels)?;
        let migration = self.plan_tree_merge(&index, &ours_listing, &tree_merge, "merge")?;

        let message = self.merge_message(revision);

        if tree_merge.is_clean() {
            let prepared = self.prepare_commit(CommitRequest {
                tree: self.database().write_tree(&tree_merge.resolved)?,
                parents: vec![ours.clone(), theirs],
                message,
                author: None,
                expected_head: Some(ours.clone()),
                hook: HookPoint::PreMergeCommit,
                operation: "merge",
            })?;
            migration.apply()?;
            self.stage_tree_merge(&mut index, &ours_listing, &tree_merge)?;
            index.write_updates()?;

            self.refs().set_orig_head(&ours)?;
            let merge_oid = self.publish_commit(prepared)?;
            return Ok(MergeOutcome::Merged(merge_oid));
        }

        self.refs().set_orig_head(&ours)?;
        PendingMerge {
            kind: PendingKind::Merge,
            orig_head: ours,
            theirs,
            message,
            author: None,
        }
        .save(self.git_dir())?;
        migration.apply()?;
        self.stage_tree_merge(&mut index, &ours_listing, &tree_merge)?;
        index.write_updates()?;

        let conflicted = tree_merge.conflicts.keys().cloned().collect::<Vec<_>>();
        tracing::info!(conflicts = conflicted.len(), "merge stopped on conflicts");
        Ok(MergeOutcome::Conflicted(conflicted))
    }

    /// Conclude a pending merge with the staged resolutions
    pub async fn merge_continue(&self, message: Option<&str>) -> anyhow::Result<ObjectId> {
        if PendingMerge::load(self.git_dir())?.is_none() {
            return Err(RepositoryError::invalid_state("there is no merge in progress"));
        }

        self.commit(message.unwrap_or_default()).await
    }

    /// Roll a pending merge, cherry-pick or revert back to where it started
    ///
    /// Paths the operation staged or left conflicted are restored from the original HEAD.
    /// Unstaged edits elsewhere and untracked files are left alone.
    pub async fn merge_abort(&self) -> anyhow::Result<ObjectId> {
        let _lock = self.lock()?;

        let pending = PendingMerge::load(self.git_dir())?
            .ok_or_else(|| RepositoryError::invalid_state("there is no merge to abort"))?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        let listing = self.database().tree_listing(Some(&pending.orig_head))?;
        self.rollback_working_tree(&mut index, &listing)?;
        index.write_updates()?;

        let head = self.refs().read_head()?;
        if head.as_ref() != Some(&pending.orig_head) {
            self.refs().update_head(
                &pending.orig_head,
                head.as_ref(),
                &format!("{}: abort", pending.kind),
            )?;
        }
        PendingMerge::clear(self.git_dir())?;
        tracing::info!(kind = %pending.kind, head = %pending.orig_head, "aborted");

        Ok(pending.orig_head)
    }

    fn merge_message(&self, revision: &str) -> String {
        match self.refs().find_ref(revision) {
            Some(sym_ref) if sym_ref.kind() == Some(RefKind::Branch) => {
                format!("Merge branch '{}'", sym_ref.short_name())
            }
            Some(sym_ref) if sym_ref.kind() == Some(RefKind::Tag) => {
                format!("Merge tag '{}'", sym_ref.short_name())
            }
            _ => format!("Merge commit '{revision}'"),
        }
    }

    pub(crate) fn resolve_trees(
        &self,
        base: &TreeListing,
        ours: &TreeListing,
        theirs: &TreeListing,
        labels: ConflictLabels,
    ) -> anyhow::Result<TreeMerge> {
        Resolve::new(self.database(), labels, self.config().merge.conflict_style)
            .merge_trees(base, ours, theirs)
    }

    /// Plan the working-tree side of a merge result and refuse if local work is in the way
    ///
    /// Staged changes anywhere block the merge, since its result is written from HEAD's
    /// tree; unstaged and untracked files block only the paths the merge touches.
    pub(crate) fn plan_tree_merge<'r>(
        &'r self,
        index: &'r Index,
        ours: &TreeListing,
        tree_merge: &TreeMerge,
        operation: &str,
    ) -> anyhow::Result<Migration<'r>> {
        if index.listing() != *ours {
            return Err(RepositoryError::invalid_state(format!(
                "cannot {operation}: your index contains uncommitted changes; commit or stash them first"
            )));
        }

        let mut migration = Migration::new(self.database(), self.workspace(), index);
        for (path, entry) in &tree_merge.resolved {
            let current = ours.get(path);
            if current != Some(entry) {
                let action = Action::Write {
                    content: self.database().load_blob(&entry.oid)?.into_content(),
                    mode: FileMode::try_from(entry.mode)?,
                };
                migration.plan_file(path, current, Some(entry), action)?;
            }
        }
        for (path, entry) in ours {
            if !tree_merge.resolved.contains_key(path) && !tree_merge.conflicts.contains_key(path) {
                migration.plan_file(path, Some(entry), None, Action::Remove)?;
            }
        }
        for (path, conflict) in &tree_merge.conflicts {
            let action = Action::Write {
                content: conflict.content.clone(),
                mode: conflict.mode,
            };
            migration.plan_file(path, ours.get(path), None, action)?;
        }
        migration.ensure_safe(operation)?;

        Ok(migration)
    }

    /// Bring the index from `ours` to the merge result, conflict stages included
    pub(crate) fn stage_tree_merge(
        &self,
        index: &mut Index,
        ours: &TreeListing,
        tree_merge: &TreeMerge,
    ) -> anyhow::Result<()> {
        for (path, entry) in &tree_merge.resolved {
            if ours.get(path) != Some(entry) {
                index.add(IndexEntry::conflicted(path.clone(), entry, Stage::Normal)?);
            }
        }
        for path in ours.keys() {
            if !tree_merge.resolved.contains_key(path) && !tree_merge.conflicts.contains_key(path) {
                index.remove(path);
            }
        }
        for (path, conflict) in &tree_merge.conflicts {
            index.add_conflict(
                path,
                conflict.base.as_ref(),
                conflict.ours.as_ref(),
                conflict.theirs.as_ref(),
            )?;
        }

        Ok(())
    }
}
