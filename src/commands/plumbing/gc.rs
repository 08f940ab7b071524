use crate::areas::repository::Repository;
use crate::artifacts::merge::pending::PendingMerge;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rebase::SuspendedRebase;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    pub kept: usize,
    pub removed: Vec<ObjectId>,
}

impl Repository {
    /// Delete every object that nothing can reach
    ///
    /// Roots are all refs, HEAD and ORIG_HEAD, a pending merge or suspended rebase, every
    /// reflog entry, the stash stack and the blobs staged in the index, so anything still
    /// recoverable survives.
    pub async fn gc(&self) -> anyhow::Result<GcReport> {
        let _lock = self.lock()?;

        let reachable = self
            .database()
            .walk_reachable(self.gc_roots().await?)
            .collect::<anyhow::Result<HashSet<_>>>()?;

        let mut report = GcReport::default();
        for oid in self.database().all_objects()? {
            if reachable.contains(&oid) {
                report.kept += 1;
            } else {
                self.database().delete(&oid)?;
                report.removed.push(oid);
            }
        }

        tracing::info!(kept = report.kept, removed = report.removed.len(), "garbage collected");
        Ok(report)
    }

    async fn gc_roots(&self) -> anyhow::Result<Vec<ObjectId>> {
        let mut roots = Vec::new();

        for sym_ref in self.refs().list_all_refs()? {
            roots.extend(self.refs().read_ref(&sym_ref)?);
        }
        roots.extend(self.refs().reflog().all_oids()?);
        roots.extend(self.stash_stack().entries()?);

        if let Some(pending) = PendingMerge::load(self.git_dir())? {
            roots.push(pending.orig_head);
            roots.push(pending.theirs);
        }
        if let Some(rebase) = SuspendedRebase::load(self.git_dir())? {
            roots.extend([rebase.orig_head, rebase.onto, rebase.tip]);
            roots.extend(rebase.remaining.into_iter().map(|item| item.commit));
        }

        let index = self.index();
        let mut index = index.lock().await;
        index.rehydrate()?;
        roots.extend(index.entries().map(|entry| entry.oid.clone()));

        Ok(roots)
    }
}
