use crate::areas::repository::Repository;
use crate::artifacts::merge::diff3::ConflictLabels;
use crate::artifacts::merge::pending::PendingKind;
use crate::commands::porcelain::cherry_pick::{PickOutcome, Replay, describe, select_parent};
use crate::commands::porcelain::commit::ensure_resolved;

impl Repository {
    /// Undo the change `revision` introduced with a new commit on HEAD
    ///
    /// History is never rewritten. The commit's tree serves as the merge base and its
    /// parent's tree as the other side.
    pub async fn revert(
        &self,
        revision: &str,
        mainline: Option<usize>,
    ) -> anyhow::Result<PickOutcome> {
        let _lock = self.lock()?;
        self.ensure_no_pending_operation()?;

        let commit_oid = self.resolve(revision)?;
        let commit = self.database().load_commit(&commit_oid)?;
        let parent = select_parent(&commit_oid, &commit, mainline)?;
        let head = self.unborn_guard("revert")?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "revert")?;

        let message = format!(
            "Revert \"{}\"\n\nThis reverts commit {commit_oid}.\n",
            commit.short_message()
        );
        let outcome = self.replay(
            &mut index,
            Replay {
                kind: PendingKind::Revert,
                base: self.database().tree_listing(Some(&commit_oid))?,
                theirs: self.database().tree_listing(parent.as_ref())?,
                parents: vec![head],
                message,
                author: None,
                labels: ConflictLabels {
                    ours: "HEAD".to_string(),
                    base: describe(&commit_oid, &commit),
                    theirs: format!("parent of {}", describe(&commit_oid, &commit)),
                },
                commit: commit_oid,
                operation: "revert",
            },
        )?;
        index.write_updates()?;

        Ok(outcome)
    }
}
