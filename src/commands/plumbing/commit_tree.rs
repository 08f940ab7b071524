use crate::areas::hooks::{HookContext, HookPoint};
use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;

/// Everything needed to create a commit and move HEAD onto it
pub(crate) struct CommitRequest<'a> {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub message: String,
    /// Keep an existing author (cherry-pick, rebase); the committer is always current
    pub author: Option<Author>,
    /// HEAD value the update is conditional on
    pub expected_head: Option<ObjectId>,
    pub hook: HookPoint,
    pub operation: &'a str,
}

impl Repository {
    /// Store the stage-0 index entries as nested trees
    pub async fn write_tree(&self) -> anyhow::Result<ObjectId> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        self.database().write_tree(&index.listing())
    }

    /// Store a commit object without moving any ref
    pub fn commit_tree(
        &self,
        tree: &ObjectId,
        parents: Vec<ObjectId>,
        message: &str,
    ) -> anyhow::Result<ObjectId> {
        self.database().load_tree(tree)?;
        let commit = Commit::new(parents, tree.clone(), self.author()?, normalize_message(message));

        self.database().store(&commit)
    }

    /// Run the hooks, store the commit and move HEAD with a compare-and-swap
    ///
    /// A rejecting pre-hook leaves nothing behind.
    pub(crate) fn record_commit(&self, request: CommitRequest<'_>) -> anyhow::Result<ObjectId> {
        let prepared = self.prepare_commit(request)?;
        self.publish_commit(prepared)
    }

    /// Run the pre-hook and store the commit object; no ref moves yet
    pub(crate) fn prepare_commit<'a>(
        &self,
        request: CommitRequest<'a>,
    ) -> anyhow::Result<PreparedCommit<'a>> {
        let message = normalize_message(&request.message);
        let context = HookContext {
            tree: request.tree.clone(),
            parents: request.parents.clone(),
            message: message.clone(),
            commit: None,
        };
        self.hooks().run(request.hook, &context)?;

        let committer = self.author()?;
        let author = request.author.unwrap_or_else(|| committer.clone());
        let commit = Commit::new(request.parents, request.tree, author, message).with_committer(committer);
        let oid = self.database().store(&commit)?;

        Ok(PreparedCommit {
            oid,
            subject: commit.short_message(),
            context,
            expected_head: request.expected_head,
            operation: request.operation,
        })
    }

    /// Move HEAD onto a stored commit, then run the post-commit hook
    pub(crate) fn publish_commit(&self, prepared: PreparedCommit<'_>) -> anyhow::Result<ObjectId> {
        let PreparedCommit {
            oid,
            subject,
            mut context,
            expected_head,
            operation,
        } = prepared;

        self.refs()
            .update_head(&oid, expected_head.as_ref(), &format!("{operation}: {subject}"))?;
        tracing::info!(commit = %oid, operation, "commit recorded");

        context.commit = Some(oid.clone());
        self.hooks().run(HookPoint::PostCommit, &context)?;

        Ok(oid)
    }
}

/// A stored commit that HEAD does not point at yet
pub(crate) struct PreparedCommit<'a> {
    oid: ObjectId,
    subject: String,
    context: HookContext,
    expected_head: Option<ObjectId>,
    operation: &'a str,
}

/// Messages are stored without surrounding blank space and with one trailing newline
pub(crate) fn normalize_message(message: &str) -> String {
    format!("{}\n", message.trim())
}
