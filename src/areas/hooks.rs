//! Commit hooks
//!
//! Callers register callbacks for a [`HookPoint`]. `Pre*` hooks run before any ref or
//! index change and can veto the operation; post-commit hooks run once the commit exists
//! and their decision is only logged.

use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    PreCommit,
    PostCommit,
    PreMergeCommit,
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPoint::PreCommit => write!(f, "pre-commit"),
            HookPoint::PostCommit => write!(f, "post-commit"),
            HookPoint::PreMergeCommit => write!(f, "pre-merge-commit"),
        }
    }
}

/// What a hook gets to see about the commit being made
#[derive(Debug, Clone)]
pub struct HookContext {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub message: String,
    /// The new commit; only set for post-commit hooks
    pub commit: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    Allow,
    Deny(String),
}

pub type Hook = Box<dyn Fn(&HookContext) -> HookDecision + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    hooks: HashMap<HookPoint, Vec<Hook>>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.hooks.iter().map(|(point, hooks)| (point, hooks.len())))
            .finish()
    }
}

impl Hooks {
    pub fn register(&mut self, point: HookPoint, hook: Hook) {
        self.hooks.entry(point).or_default().push(hook);
    }

    /// Run every hook for `point`; the first denial wins
    pub fn run(&self, point: HookPoint, context: &HookContext) -> anyhow::Result<()> {
        for hook in self.hooks.get(&point).into_iter().flatten() {
            if let HookDecision::Deny(reason) = hook(context) {
                if point == HookPoint::PostCommit {
                    tracing::warn!(hook = %point, %reason, "post-commit hook objected after the fact");
                    continue;
                }

                tracing::info!(hook = %point, %reason, "hook rejected operation");
                return Err(RepositoryError::HookRejected {
                    hook: point.to_string(),
                    reason,
                }
                .into());
            }
        }

        Ok(())
    }
}
