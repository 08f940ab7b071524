use crate::areas::index::Index;
use crate::areas::refs::Head;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::RefKind;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::database::TreeListing;
use crate::artifacts::index::index_entry::{IndexEntry, Stage};

impl Repository {
    /// Switch HEAD to `target`, carrying uncommitted changes that do not collide
    ///
    /// Branches are attached; any other revision detaches HEAD. Nothing is written when a
    /// local change would be overwritten.
    pub async fn checkout(&self, target: &str) -> anyhow::Result<Head> {
        let _lock = self.lock()?;
        self.ensure_no_pending_operation()?;

        let target_oid = self.resolve(target)?;
        let new_head = match self.refs().find_ref(target) {
            Some(sym_ref) if sym_ref.kind() == Some(RefKind::Branch) => Head::Attached(sym_ref),
            _ => Head::Detached(target_oid.clone()),
        };

        let old_listing = self.head_listing()?;
        let new_listing = self.database().tree_listing(Some(&target_oid))?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;
        self.switch_trees(&mut index, &old_listing, &new_listing, "checkout")?;
        index.write_updates()?;

        let from = match self.refs().head()? {
            Head::Attached(branch) => branch.short_name().to_string(),
            Head::Detached(oid) => oid.to_short_oid(),
        };
        self.refs()
            .set_head(&new_head, &format!("checkout: moving from {from} to {target}"))?;
        tracing::info!(target, head = ?new_head, "checked out");

        Ok(new_head)
    }

    /// Move the working tree and index from `old` to `new`, keeping unrelated local changes
    pub(crate) fn switch_trees(
        &self,
        index: &mut Index,
        old: &TreeListing,
        new: &TreeListing,
        operation: &str,
    ) -> anyhow::Result<()> {
        let mut migration = Migration::new(self.database(), self.workspace(), index);
        migration.plan_trees(old, new)?;
        migration.ensure_safe(operation)?;
        migration.apply()?;

        let changed = migration.actions().keys().cloned().collect::<Vec<_>>();
        for path in changed {
            match new.get(&path) {
                Some(entry) => index.add(IndexEntry::conflicted(path, entry, Stage::Normal)?),
                None => index.remove(&path),
            }
        }

        Ok(())
    }
}
