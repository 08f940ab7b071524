//! Read-only queries over the commit graph
//!
//! Commits are fetched through a loader closure, as in [`BCAFinder`], so the same walks
//! run against the object store and against in-memory graphs in tests.

use crate::areas::database::Database;
use crate::artifacts::merge::bca_finder::BCAFinder;
use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::{BinaryHeap, HashSet};

pub struct History<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

pub type CommitLoader<'d> = Box<dyn Fn(&ObjectId) -> anyhow::Result<SlimCommit> + 'd>;

impl<'d> History<CommitLoader<'d>> {
    pub fn from_database(database: &'d Database) -> Self {
        let loader: CommitLoader<'d> = Box::new(move |oid: &ObjectId| database.slim_commit(oid));
        History::new(loader)
    }
}

impl<CommitLoaderFn> History<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        History { commit_loader }
    }

    pub fn load(&self, oid: &ObjectId) -> anyhow::Result<SlimCommit> {
        (self.commit_loader)(oid)
    }

    /// Lazily walk `start` and its ancestors, newest first
    ///
    /// With `first_parent` only the mainline is followed.
    pub fn ancestors(&self, start: &ObjectId, first_parent: bool) -> Ancestors<'_, CommitLoaderFn> {
        Ancestors {
            history: self,
            queue: BinaryHeap::new(),
            pending_start: Some(start.clone()),
            seen: HashSet::new(),
            first_parent,
        }
    }

    /// Every commit reachable from `start`, `start` included
    pub fn reachable_set(&self, start: &ObjectId) -> anyhow::Result<HashSet<ObjectId>> {
        self.ancestors(start, false).collect()
    }

    /// All best common ancestors, the chosen one first
    pub fn merge_bases(&self, a: &ObjectId, b: &ObjectId) -> anyhow::Result<Vec<ObjectId>> {
        if a == b {
            return Ok(vec![a.clone()]);
        }

        BCAFinder::new(|oid| self.load(oid)).find_best_common_ancestors(a, b)
    }

    /// The merge base of `a` and `b`; `None` when their histories are unrelated
    pub fn merge_base(&self, a: &ObjectId, b: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        Ok(self.merge_bases(a, b)?.into_iter().next())
    }

    /// Whether `ancestor` is `descendant` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> anyhow::Result<bool> {
        BCAFinder::new(|oid| self.load(oid)).is_reachable(descendant, ancestor)
    }

    /// Non-merge commits reachable from `branch` but not from `upstream`, oldest first
    pub fn unique_commits(
        &self,
        branch: &ObjectId,
        upstream: &ObjectId,
    ) -> anyhow::Result<Vec<ObjectId>> {
        let excluded = self.reachable_set(upstream)?;

        let mut commits = Vec::new();
        for oid in self.ancestors(branch, false) {
            let oid = oid?;
            if excluded.contains(&oid) {
                continue;
            }
            if self.load(&oid)?.parents.len() <= 1 {
                commits.push(oid);
            }
        }
        commits.reverse();

        Ok(commits)
    }
}

/// Iterator returned by [`History::ancestors`]
pub struct Ancestors<'h, CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    history: &'h History<CommitLoaderFn>,
    queue: BinaryHeap<SlimCommit>,
    pending_start: Option<ObjectId>,
    seen: HashSet<ObjectId>,
    first_parent: bool,
}

impl<CommitLoaderFn> Ancestors<'_, CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    fn enqueue(&mut self, oid: &ObjectId) -> anyhow::Result<()> {
        if self.seen.insert(oid.clone()) {
            self.queue.push(self.history.load(oid)?);
        }

        Ok(())
    }

    fn advance(&mut self) -> anyhow::Result<Option<ObjectId>> {
        if let Some(start) = self.pending_start.take() {
            self.enqueue(&start)?;
        }

        let Some(commit) = self.queue.pop() else {
            return Ok(None);
        };

        let parents = if self.first_parent {
            &commit.parents[..commit.parents.len().min(1)]
        } else {
            &commit.parents[..]
        };
        for parent in parents {
            self.enqueue(parent)?;
        }

        Ok(Some(commit.oid))
    }
}

impl<CommitLoaderFn> Iterator for Ancestors<'_, CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    type Item = anyhow::Result<ObjectId>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(next) => next.map(Ok),
            Err(error) => {
                // stop after reporting the failure
                self.queue.clear();
                Some(Err(error))
            }
        }
    }
}
