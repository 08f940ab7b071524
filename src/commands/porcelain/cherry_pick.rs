use crate::areas::hooks::HookPoint;
use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::TreeListing;
use crate::artifacts::merge::diff3::ConflictLabels;
use crate::artifacts::merge::pending::{PendingKind, PendingMerge};
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::plumbing::commit_tree::CommitRequest;
use crate::commands::porcelain::commit::ensure_resolved;
use crate::errors::RepositoryError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Committed(ObjectId),
    /// The change is already present; nothing was created
    Empty,
    /// Stopped on conflicts; resolve, then `commit` or `merge_abort`
    Conflicted(Vec<PathBuf>),
}

/// One commit's change, expressed as a three-way merge onto HEAD
pub(crate) struct Replay<'a> {
    pub kind: PendingKind,
    /// The commit being picked or reverted
    pub commit: ObjectId,
    pub base: TreeListing,
    pub theirs: TreeListing,
    /// Parents of the resulting commit; `[HEAD]` unless folding into HEAD
    pub parents: Vec<ObjectId>,
    pub message: String,
    pub author: Option<Author>,
    pub labels: ConflictLabels,
    pub operation: &'a str,
}

impl Repository {
    /// Apply the change `revision` introduced as a new commit on HEAD
    ///
    /// The author and message are kept. A merge commit needs `mainline`, the 1-based parent
    /// its change is measured against.
    pub async fn cherry_pick(
        &self,
        revision: &str,
        mainline: Option<usize>,
    ) -> anyhow::Result<PickOutcome> {
        let _lock = self.lock()?;
        self.ensure_no_pending_operation()?;

        let commit_oid = self.resolve(revision)?;
        let commit = self.database().load_commit(&commit_oid)?;
        let parent = select_parent(&commit_oid, &commit, mainline)?;
        let head = self.unborn_guard("cherry-pick")?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "cherry-pick")?;

        let outcome = self.replay(
            &mut index,
            Replay {
                kind: PendingKind::CherryPick,
                base: self.database().tree_listing(parent.as_ref())?,
                theirs: self.database().tree_listing(Some(&commit_oid))?,
                parents: vec![head],
                message: commit.message().to_string(),
                author: Some(commit.author().clone()),
                labels: ConflictLabels {
                    ours: "HEAD".to_string(),
                    base: "parent of ".to_string() + &describe(&commit_oid, &commit),
                    theirs: describe(&commit_oid, &commit),
                },
                commit: commit_oid,
                operation: "cherry-pick",
            },
        )?;
        index.write_updates()?;

        Ok(outcome)
    }

    /// Merge one replayed change onto HEAD and commit it when clean
    ///
    /// On conflicts the operation is recorded as pending and the index keeps the conflict
    /// stages. The caller writes the index.
    pub(crate) fn replay(&self, index: &mut Index, replay: Replay<'_>) -> anyhow::Result<PickOutcome> {
        let head = self.unborn_guard(replay.operation)?;
        let ours = self.database().tree_listing(Some(&head))?;

        let tree_merge = self.resolve_trees(&replay.base, &ours, &replay.theirs, replay.labels)?;
        let migration = self.plan_tree_merge(index, &ours, &tree_merge, replay.operation)?;

        if tree_merge.is_clean() {
            if tree_merge.resolved == ours && replay.parents == [head.clone()] {
                tracing::info!(commit = %replay.commit, "change already applied, nothing to commit");
                return Ok(PickOutcome::Empty);
            }

            let prepared = self.prepare_commit(CommitRequest {
                tree: self.database().write_tree(&tree_merge.resolved)?,
                parents: replay.parents,
                message: replay.message,
                author: replay.author,
                expected_head: Some(head),
                hook: HookPoint::PreCommit,
                operation: replay.operation,
            })?;
            migration.apply()?;
            self.stage_tree_merge(index, &ours, &tree_merge)?;
            let commit_oid = self.publish_commit(prepared)?;

            return Ok(PickOutcome::Committed(commit_oid));
        }

        PendingMerge {
            kind: replay.kind,
            orig_head: head,
            theirs: replay.commit,
            message: replay.message,
            author: replay.author.map(|author| author.display()),
        }
        .save(self.git_dir())?;
        migration.apply()?;
        self.stage_tree_merge(index, &ours, &tree_merge)?;

        let conflicted = tree_merge.conflicts.keys().cloned().collect::<Vec<_>>();
        tracing::info!(operation = replay.operation, conflicts = conflicted.len(), "stopped on conflicts");
        Ok(PickOutcome::Conflicted(conflicted))
    }

    pub(crate) fn unborn_guard(&self, operation: &str) -> anyhow::Result<ObjectId> {
        self.refs().read_head()?.ok_or_else(|| {
            RepositoryError::invalid_state(format!("cannot {operation} onto an unborn branch"))
        })
    }
}

/// The parent a commit's change is measured against; `None` for a root commit
pub(crate) fn select_parent(
    oid: &ObjectId,
    commit: &Commit,
    mainline: Option<usize>,
) -> anyhow::Result<Option<ObjectId>> {
    match (commit.is_merge(), mainline) {
        (true, None) => Err(RepositoryError::invalid_state(format!(
            "commit {oid} is a merge but no mainline was given"
        ))),
        (true, Some(mainline)) => mainline
            .checked_sub(1)
            .and_then(|position| commit.parents().get(position))
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                RepositoryError::invalid_state(format!(
                    "commit {oid} does not have parent {mainline}"
                ))
            }),
        (false, Some(_)) => Err(RepositoryError::invalid_state(format!(
            "mainline was specified but commit {oid} is not a merge"
        ))),
        (false, None) => Ok(commit.parent().cloned()),
    }
}

pub(crate) fn describe(oid: &ObjectId, commit: &Commit) -> String {
    format!("{} ({})", oid.to_short_oid(), commit.short_message())
}
