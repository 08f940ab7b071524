//! Best common ancestor finder
//!
//! A best common ancestor (BCA) of commits X and Y is a common ancestor of both that is not
//! an ancestor of any other common ancestor. It is the base of a three-way merge.
//!
//! ## Algorithm
//!
//! 1. Walk both histories at once, newest commit first, tagging each commit with the
//!    side(s) it was reached from. A commit reached from both sides is a common ancestor;
//!    its own ancestors are marked `STALE` since they can never be best.
//! 2. Drop every candidate that is an ancestor of another candidate.
//!
//! Criss-cross histories can leave several BCAs. [`BCAFinder::find_best_common_ancestor`]
//! picks one deterministically (most recent, then smallest ID) rather than synthesising a
//! virtual base, so merges across criss-crosses may report conflicts a recursive merge
//! would have resolved.
//!
//! Commits are fetched through a loader closure so the finder works against the object
//! store and against in-memory graphs alike.

use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b00;
        const VISITED_FROM_SOURCE = 0b01;
        const VISITED_FROM_TARGET = 0b10;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_SOURCE.bits() | Self::VISITED_FROM_TARGET.bits();
        const STALE = 0b100;
        const RESULT = 0b1000;
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (VisitState::VISITED_FROM_SOURCE, "SOURCE"),
            (VisitState::VISITED_FROM_TARGET, "TARGET"),
            (VisitState::STALE, "STALE"),
            (VisitState::RESULT, "RESULT"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect::<Vec<_>>();

        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

pub struct BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

impl<CommitLoaderFn> BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self { commit_loader }
    }

    /// Phase 1: commits reachable from the source and from any target, minus stale ones
    fn find_common_ancestors(
        &self,
        source_commit_id: &ObjectId,
        target_commit_ids: &HashSet<&ObjectId>,
    ) -> anyhow::Result<HashSet<ObjectId>> {
        if target_commit_ids.contains(source_commit_id) {
            return Ok(HashSet::from([source_commit_id.clone()]));
        }

        let mut ancestors_states = HashMap::<ObjectId, VisitState>::new();
        let mut priority_queue = BinaryHeap::new();

        let source_commit = (self.commit_loader)(source_commit_id)?;
        ancestors_states.insert(source_commit.oid.clone(), VisitState::VISITED_FROM_SOURCE);
        priority_queue.push((source_commit.timestamp, source_commit.oid));

        for &target_commit_id in target_commit_ids {
            let target_commit = (self.commit_loader)(target_commit_id)?;
            ancestors_states.insert(target_commit.oid.clone(), VisitState::VISITED_FROM_TARGET);
            priority_queue.push((target_commit.timestamp, target_commit.oid));
        }

        while let Some((_, commit_id)) = priority_queue.pop() {
            let current_state = ancestors_states
                .get(&commit_id)
                .copied()
                .unwrap_or(VisitState::NONE);

            tracing::trace!(commit = %commit_id, state = ?current_state, "merge-base visit");

            if current_state.contains(VisitState::STALE) {
                continue;
            }

            let is_common_ancestor = current_state.contains(VisitState::VISITED_FROM_BOTH);
            if is_common_ancestor {
                ancestors_states
                    .entry(commit_id.clone())
                    .and_modify(|state| *state |= VisitState::RESULT);
            }

            let current_commit = (self.commit_loader)(&commit_id)?;
            for parent_id in &current_commit.parents {
                let parent_state = ancestors_states
                    .get(parent_id)
                    .copied()
                    .unwrap_or(VisitState::NONE);

                let mut new_state = parent_state | current_state;
                if is_common_ancestor {
                    new_state |= VisitState::STALE;
                }

                if new_state != parent_state {
                    let parent_commit = (self.commit_loader)(parent_id)?;
                    ancestors_states.insert(parent_id.clone(), new_state);
                    priority_queue.push((parent_commit.timestamp, parent_id.clone()));
                }
            }
        }

        Ok(ancestors_states
            .into_iter()
            .filter(|(_, state)| {
                state.contains(VisitState::RESULT) && !state.contains(VisitState::STALE)
            })
            .map(|(oid, _)| oid)
            .collect())
    }

    /// Every best common ancestor, most recent first
    pub fn find_best_common_ancestors(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> anyhow::Result<Vec<ObjectId>> {
        let common_ancestors =
            self.find_common_ancestors(source_commit_id, &HashSet::from([target_commit_id]))?;

        tracing::debug!(
            source = %source_commit_id,
            target = %target_commit_id,
            candidates = common_ancestors.len(),
            "common ancestors found"
        );

        // Phase 2: drop candidates reachable from another candidate
        let mut best = Vec::new();
        for commit in &common_ancestors {
            let mut redundant = false;
            for other in common_ancestors.iter().filter(|other| *other != commit) {
                if self.is_reachable(other, commit)? {
                    tracing::trace!(%commit, via = %other, "redundant common ancestor");
                    redundant = true;
                    break;
                }
            }

            if !redundant {
                best.push((self.commit_loader)(commit)?);
            }
        }

        // newest first, ties by smallest ID
        best.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.oid.cmp(&b.oid))
        });

        Ok(best.into_iter().map(|slim| slim.oid).collect())
    }

    /// The chosen merge base, `None` for unrelated histories
    pub fn find_best_common_ancestor(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> anyhow::Result<Option<ObjectId>> {
        let best = self.find_best_common_ancestors(source_commit_id, target_commit_id)?;
        if best.len() > 1 {
            tracing::debug!(
                count = best.len(),
                chosen = %best[0],
                "several best common ancestors, choosing the most recent"
            );
        }

        Ok(best.into_iter().next())
    }

    /// Whether `ancestor` can be reached from `descendant` through parent links
    pub fn is_reachable(
        &self,
        descendant: &ObjectId,
        ancestor: &ObjectId,
    ) -> anyhow::Result<bool> {
        let mut seen = HashSet::new();
        let mut pending = vec![descendant.clone()];

        while let Some(oid) = pending.pop() {
            if &oid == ancestor {
                return Ok(true);
            }
            if !seen.insert(oid.clone()) {
                continue;
            }

            pending.extend((self.commit_loader)(&oid)?.parents);
        }

        Ok(false)
    }
}
