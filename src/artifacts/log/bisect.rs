//! Binary search for the commit that introduced a change
//!
//! The session keeps the set of commits that may still be the first bad one: ancestors of
//! the current bad commit that no good commit can reach. Each round tests the candidate
//! that splits that set most evenly, and every answer prunes it with ancestry queries.

use crate::artifacts::log::history::History;
use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where the command line keeps an open session between invocations
pub const BISECT_STATE_FILE: &str = "BISECT_STATE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BisectStep {
    /// Check out and test this commit, then `mark` it
    Test(ObjectId),
    /// The first bad commit
    Done(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bisect {
    bad: ObjectId,
    /// Newest first
    candidates: Vec<ObjectId>,
    steps: usize,
}

impl Bisect {
    pub fn start<F>(history: &History<F>, bad: &ObjectId, goods: &[ObjectId]) -> anyhow::Result<Self>
    where
        F: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
    {
        let mut excluded = HashSet::new();
        for good in goods {
            excluded.extend(history.reachable_set(good)?);
        }

        let mut candidates = Vec::new();
        for oid in history.ancestors(bad, false) {
            let oid = oid?;
            if !excluded.contains(&oid) {
                candidates.push(oid);
            }
        }

        tracing::info!(%bad, goods = goods.len(), candidates = candidates.len(), "bisect started");
        Ok(Bisect {
            bad: bad.clone(),
            candidates,
            steps: 0,
        })
    }

    pub fn bad(&self) -> &ObjectId {
        &self.bad
    }

    /// Commits answered so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }

    pub fn next<F>(&self, history: &History<F>) -> anyhow::Result<BisectStep>
    where
        F: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
    {
        if self.candidates.len() <= 1 {
            return Ok(BisectStep::Done(self.bad.clone()));
        }

        let total = self.candidates.len();
        let mut best: Option<(usize, &ObjectId)> = None;
        for candidate in &self.candidates {
            if candidate == &self.bad {
                continue;
            }

            let reach = self.reach(history, candidate)?;
            let balance = reach.min(total - reach);
            if best.is_none_or(|(best_balance, _)| balance > best_balance) {
                best = Some((balance, candidate));
            }
        }

        Ok(match best {
            Some((_, candidate)) => BisectStep::Test(candidate.clone()),
            None => BisectStep::Done(self.bad.clone()),
        })
    }

    /// Record the verdict for a tested commit
    pub fn mark<F>(&mut self, history: &History<F>, oid: &ObjectId, good: bool) -> anyhow::Result<()>
    where
        F: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
    {
        let reachable = history.reachable_set(oid)?;
        if good {
            self.candidates.retain(|candidate| !reachable.contains(candidate));
        } else {
            self.candidates.retain(|candidate| reachable.contains(candidate));
            self.bad = oid.clone();
        }
        self.steps += 1;

        tracing::debug!(%oid, good, remaining = self.candidates.len(), "bisect step");
        Ok(())
    }

    pub fn path(git_dir: &Path) -> PathBuf {
        git_dir.join(BISECT_STATE_FILE)
    }

    pub fn load(git_dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = Self::path(git_dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let session = toml::from_str(&content)
            .with_context(|| format!("Malformed bisect state in {}", path.display()))?;

        Ok(Some(session))
    }

    pub fn save(&self, git_dir: &Path) -> anyhow::Result<()> {
        let path = Self::path(git_dir);
        let temp_path = path.with_extension("tmp");
        let content = toml::to_string(self).context("Unable to serialize bisect state")?;

        std::fs::write(&temp_path, content)
            .with_context(|| format!("Unable to write {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Unable to move bisect state into {}", path.display()))
    }

    pub fn clear(git_dir: &Path) -> anyhow::Result<()> {
        let path = Self::path(git_dir);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Unable to remove {}", path.display()))?;
        }

        Ok(())
    }

    /// Candidates reachable from `oid`, itself included
    fn reach<F>(&self, history: &History<F>, oid: &ObjectId) -> anyhow::Result<usize>
    where
        F: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
    {
        let reachable = history.reachable_set(oid)?;
        Ok(self
            .candidates
            .iter()
            .filter(|candidate| reachable.contains(*candidate))
            .count())
    }
}
