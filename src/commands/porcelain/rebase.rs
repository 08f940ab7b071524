use crate::areas::hooks::HookPoint;
use crate::areas::index::Index;
use crate::areas::refs::Head;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::SymRefName;
use crate::artifacts::log::history::History;
use crate::artifacts::merge::diff3::ConflictLabels;
use crate::artifacts::merge::pending::{PendingKind, PendingMerge};
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rebase::todo::{RebasePlan, TodoAction, TodoItem};
use crate::artifacts::rebase::{RebaseOutcome, RebaseStop, StopReason, SuspendedRebase};
use crate::commands::plumbing::commit_tree::CommitRequest;
use crate::commands::porcelain::cherry_pick::{PickOutcome, Replay, describe, select_parent};
use crate::commands::porcelain::commit::ensure_resolved;
use crate::errors::RepositoryError;

enum Step {
    Advanced(ObjectId),
    Skipped,
    Stopped(StopReason),
}

impl Repository {
    /// Commits of the current branch missing from `onto`, oldest first, all picked
    pub fn rebase_plan(&self, onto: &str) -> anyhow::Result<RebasePlan> {
        let head = self.unborn_guard("rebase")?;
        let onto = self.resolve(onto)?;

        let items = History::from_database(self.database())
            .unique_commits(&head, &onto)?
            .into_iter()
            .map(|commit| {
                Ok(TodoItem {
                    action: TodoAction::Pick,
                    subject: self.database().load_commit(&commit)?.short_message(),
                    commit,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(RebasePlan { onto, items })
    }

    /// Replay `plan` on top of its target, then move the current branch to the result
    ///
    /// A branch already based on the target with an unmodified plan is left untouched.
    pub async fn rebase(&self, plan: RebasePlan) -> anyhow::Result<RebaseOutcome> {
        let _lock = self.lock()?;
        self.ensure_no_pending_operation()?;
        if SuspendedRebase::load(self.git_dir())?.is_some() {
            return Err(RepositoryError::invalid_state("a rebase is already in progress"));
        }

        let branch = self
            .refs()
            .current_branch()?
            .ok_or_else(|| RepositoryError::invalid_state("cannot rebase a detached HEAD"))?;
        let head = self.unborn_guard("rebase")?;

        if self.is_noop_rebase(&head, &plan)? {
            tracing::info!(%branch, onto = %plan.onto, "branch is up to date");
            return Ok(RebaseOutcome::UpToDate);
        }

        let head_listing = self.database().tree_listing(Some(&head))?;
        let onto_listing = self.database().tree_listing(Some(&plan.onto))?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "rebase")?;
        if index.listing() != head_listing {
            return Err(RepositoryError::invalid_state(
                "cannot rebase: your index contains uncommitted changes; commit or stash them first",
            ));
        }

        self.switch_trees(&mut index, &head_listing, &onto_listing, "rebase")?;
        index.write_updates()?;

        self.refs().set_orig_head(&head)?;
        self.refs().set_head(
            &Head::Detached(plan.onto.clone()),
            &format!("rebase (start): checkout {}", plan.onto.to_short_oid()),
        )?;
        tracing::info!(%branch, onto = %plan.onto, steps = plan.items.len(), "rebase started");

        let state = SuspendedRebase {
            branch: branch.to_string(),
            orig_head: head,
            onto: plan.onto.clone(),
            tip: plan.onto,
            stopped: None,
            remaining: plan.items,
        };
        self.run_rebase(&mut index, state)
    }

    /// Resume after resolving a conflict or amending an `edit` stop
    ///
    /// A conflicted step is concluded with the staged resolution, unless it was already
    /// committed by hand.
    pub async fn rebase_continue(&self, mut state: SuspendedRebase) -> anyhow::Result<RebaseOutcome> {
        let _lock = self.lock()?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        ensure_resolved(&index, "continue the rebase")?;

        if let Some(stop) = state.stopped.take() {
            let pending = PendingMerge::load(self.git_dir())?;
            if stop.reason == StopReason::Conflict && pending.is_some() {
                let head = self.unborn_guard("rebase")?;
                let commit = self.database().load_commit(&stop.item.commit)?;
                let (parents, message, author) =
                    self.step_commit(&head, &state.onto, &stop.item, &commit)?;

                self.record_commit(CommitRequest {
                    tree: self.database().write_tree(&index.listing())?,
                    parents,
                    message,
                    author: Some(author),
                    expected_head: Some(head),
                    hook: HookPoint::PreCommit,
                    operation: "rebase (continue)",
                })?;
                PendingMerge::clear(self.git_dir())?;
            }

            state.tip = self.unborn_guard("rebase")?;
        }

        self.run_rebase(&mut index, state)
    }

    /// Drop the replayed commits and put the branch and working tree back where they were
    pub async fn rebase_abort(&self, state: SuspendedRebase) -> anyhow::Result<ObjectId> {
        let _lock = self.lock()?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        let listing = self.database().tree_listing(Some(&state.orig_head))?;
        self.rollback_working_tree(&mut index, &listing)?;
        index.write_updates()?;
        PendingMerge::clear(self.git_dir())?;

        let branch = SymRefName::new(state.branch);
        let current = self.refs().read_ref(&branch)?;
        if current.as_ref() != Some(&state.orig_head) {
            self.refs()
                .update_ref(&branch, &state.orig_head, current.as_ref(), "rebase (abort)")?;
        }
        self.refs().set_head(
            &Head::Attached(branch.clone()),
            &format!("rebase (abort): returning to {branch}"),
        )?;
        tracing::info!(%branch, head = %state.orig_head, "rebase aborted");

        Ok(state.orig_head)
    }

    fn is_noop_rebase(&self, head: &ObjectId, plan: &RebasePlan) -> anyhow::Result<bool> {
        let history = History::from_database(self.database());
        if history.merge_base(head, &plan.onto)?.as_ref() != Some(&plan.onto) {
            return Ok(false);
        }

        let unique = history.unique_commits(head, &plan.onto)?;
        Ok(plan.items.len() == unique.len()
            && plan
                .items
                .iter()
                .zip(&unique)
                .all(|(item, commit)| item.action == TodoAction::Pick && &item.commit == commit))
    }

    fn run_rebase(
        &self,
        index: &mut Index,
        mut state: SuspendedRebase,
    ) -> anyhow::Result<RebaseOutcome> {
        while !state.remaining.is_empty() {
            let item = state.remaining.remove(0);
            let step = self.rebase_step(index, &state.tip, &state.onto, &item)?;
            index.write_updates()?;

            match step {
                Step::Advanced(tip) => state.tip = tip,
                Step::Skipped => tracing::debug!(commit = %item.commit, "nothing to replay"),
                Step::Stopped(reason) => {
                    tracing::info!(commit = %item.commit, ?reason, left = state.remaining.len(), "rebase paused");
                    state.tip = self.unborn_guard("rebase")?;
                    state.stopped = Some(RebaseStop { reason, item });
                    return Ok(RebaseOutcome::Paused(state));
                }
            }
        }

        let branch = SymRefName::new(state.branch.clone());
        self.refs().update_ref(
            &branch,
            &state.tip,
            Some(&state.orig_head),
            &format!("rebase (finish): {branch} onto {}", state.onto),
        )?;
        self.refs().set_head(
            &Head::Attached(branch.clone()),
            &format!("rebase (finish): returning to {branch}"),
        )?;
        tracing::info!(%branch, tip = %state.tip, "rebase finished");

        Ok(RebaseOutcome::Completed(state.tip))
    }

    fn rebase_step(
        &self,
        index: &mut Index,
        tip: &ObjectId,
        onto: &ObjectId,
        item: &TodoItem,
    ) -> anyhow::Result<Step> {
        if item.action == TodoAction::Drop {
            return Ok(Step::Skipped);
        }

        let commit = self.database().load_commit(&item.commit)?;
        let parent = select_parent(&item.commit, &commit, None)?;
        let (parents, message, author) = self.step_commit(tip, onto, item, &commit)?;
        let operation = format!("rebase ({})", item.action.keyword());
        tracing::debug!(commit = %item.commit, action = item.action.keyword(), "replaying");

        let outcome = self.replay(
            index,
            Replay {
                kind: PendingKind::CherryPick,
                commit: item.commit.clone(),
                base: self.database().tree_listing(parent.as_ref())?,
                theirs: self.database().tree_listing(Some(&item.commit))?,
                parents,
                message,
                author: Some(author),
                labels: ConflictLabels {
                    ours: "HEAD".to_string(),
                    base: format!("parent of {}", describe(&item.commit, &commit)),
                    theirs: describe(&item.commit, &commit),
                },
                operation: &operation,
            },
        )?;

        Ok(match outcome {
            PickOutcome::Committed(_) if item.action == TodoAction::Edit => {
                Step::Stopped(StopReason::Edit)
            }
            PickOutcome::Committed(commit) => Step::Advanced(commit),
            PickOutcome::Empty => Step::Skipped,
            PickOutcome::Conflicted(_) => Step::Stopped(StopReason::Conflict),
        })
    }

    /// Parents, message and author of the commit a todo item produces on top of `tip`
    ///
    /// Squash and fixup replace `tip` rather than extend it.
    fn step_commit(
        &self,
        tip: &ObjectId,
        onto: &ObjectId,
        item: &TodoItem,
        commit: &Commit,
    ) -> anyhow::Result<(Vec<ObjectId>, String, Author)> {
        if !item.action.folds() {
            let message = match &item.action {
                TodoAction::Reword(message) => message.clone(),
                _ => commit.message().to_string(),
            };
            return Ok((vec![tip.clone()], message, commit.author().clone()));
        }

        if tip == onto {
            return Err(RepositoryError::invalid_state(format!(
                "cannot {} {}: there is no previous commit to fold into",
                item.action.keyword(),
                item.commit.to_short_oid()
            )));
        }

        let previous = self.database().load_commit(tip)?;
        let message = match item.action {
            TodoAction::Squash => format!(
                "{}\n\n{}",
                previous.message().trim_end(),
                commit.message().trim_end()
            ),
            _ => previous.message().to_string(),
        };

        Ok((previous.parents().to_vec(), message, previous.author().clone()))
    }
}
