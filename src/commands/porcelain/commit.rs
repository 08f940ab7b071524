use crate::areas::hooks::HookPoint;
use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::merge::pending::{PendingKind, PendingMerge};
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::plumbing::commit_tree::CommitRequest;
use crate::errors::RepositoryError;

impl Repository {
    /// Commit the index on top of HEAD
    ///
    /// While a merge, cherry-pick or revert is pending this concludes it, reusing its
    /// parents, author and message (when `message` is empty).
    pub async fn commit(&self, message: &str) -> anyhow::Result<ObjectId> {
        let _lock = self.lock()?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "commit")?;

        let head = self.refs().read_head()?;
        let tree = self.database().write_tree(&index.listing())?;
        let pending = PendingMerge::load(self.git_dir())?;

        let request = match &pending {
            Some(pending) => {
                let head = head.as_ref().ok_or_else(|| {
                    RepositoryError::invalid_state(format!("{} in progress on an unborn branch", pending.kind))
                })?;
                let message = if message.trim().is_empty() {
                    pending.message.clone()
                } else {
                    message.to_string()
                };

                CommitRequest {
                    tree,
                    parents: pending.parents(head),
                    message,
                    author: pending.original_author()?,
                    expected_head: Some(head.clone()),
                    hook: match pending.kind {
                        PendingKind::Merge => HookPoint::PreMergeCommit,
                        PendingKind::CherryPick | PendingKind::Revert => HookPoint::PreCommit,
                    },
                    operation: match pending.kind {
                        PendingKind::Merge => "commit (merge)",
                        PendingKind::CherryPick => "cherry-pick",
                        PendingKind::Revert => "revert",
                    },
                }
            }
            None => {
                let head_tree = match &head {
                    Some(head) => Some(self.database().load_commit(head)?.tree_oid().clone()),
                    None => None,
                };
                let unchanged = match &head_tree {
                    Some(head_tree) => head_tree == &tree,
                    None => index.listing().is_empty(),
                };
                if unchanged {
                    return Err(RepositoryError::invalid_state("nothing to commit, working tree clean"));
                }
                if message.trim().is_empty() {
                    return Err(RepositoryError::invalid_state("aborting commit due to empty commit message"));
                }

                CommitRequest {
                    tree,
                    parents: head.iter().cloned().collect(),
                    message: message.to_string(),
                    author: None,
                    expected_head: head.clone(),
                    hook: HookPoint::PreCommit,
                    operation: if head.is_some() {
                        "commit"
                    } else {
                        "commit (initial)"
                    },
                }
            }
        };

        let commit_oid = self.record_commit(request)?;
        if pending.is_some() {
            PendingMerge::clear(self.git_dir())?;
        }

        Ok(commit_oid)
    }

    /// Replace HEAD with a commit of the current index sharing HEAD's parents
    ///
    /// The original commit stays reachable through the reflog.
    pub async fn amend(&self, message: Option<&str>) -> anyhow::Result<ObjectId> {
        let _lock = self.lock()?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "amend")?;
        self.ensure_no_pending_operation()?;

        let head = self
            .refs()
            .read_head()?
            .ok_or_else(|| RepositoryError::invalid_state("nothing to amend on an unborn branch"))?;
        let amended = self.database().load_commit(&head)?;

        self.record_commit(CommitRequest {
            tree: self.database().write_tree(&index.listing())?,
            parents: amended.parents().to_vec(),
            message: message.unwrap_or(amended.message()).to_string(),
            author: Some(amended.author().clone()),
            expected_head: Some(head),
            hook: HookPoint::PreCommit,
            operation: "commit (amend)",
        })
    }

    /// Refuse to start an operation while a merge, cherry-pick or revert awaits resolution
    pub(crate) fn ensure_no_pending_operation(&self) -> anyhow::Result<()> {
        match PendingMerge::load(self.git_dir())? {
            Some(pending) => Err(RepositoryError::invalid_state(format!(
                "a {} is in progress; commit the resolution or abort it first",
                pending.kind
            ))),
            None => Ok(()),
        }
    }
}

/// Unmerged paths block anything that writes a tree from the index
pub(crate) fn ensure_resolved(index: &Index, operation: &str) -> anyhow::Result<()> {
    let conflicted = index.conflicted_paths();
    if conflicted.is_empty() {
        return Ok(());
    }

    let paths = conflicted
        .iter()
        .map(|path| format!("\t{}", path.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(RepositoryError::invalid_state(format!(
        "cannot {operation}: unmerged paths\n{paths}"
    )))
}
