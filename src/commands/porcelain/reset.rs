use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::database::TreeListing;
use crate::artifacts::diff::tree_diff::diff_listings;
use crate::artifacts::merge::pending::PendingMerge;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Move HEAD only
    Soft,
    /// Move HEAD and reload the index
    Mixed,
    /// Move HEAD, reload the index and overwrite tracked working files
    Hard,
}

impl Repository {
    /// Point HEAD (or the branch it is attached to) at `revision`
    ///
    /// The previous HEAD is saved as ORIG_HEAD and stays in the reflog. Mixed and hard
    /// resets also drop a pending merge.
    pub async fn reset(&self, mode: ResetMode, revision: &str) -> anyhow::Result<ObjectId> {
        let _lock = self.lock()?;

        let target = self.resolve(revision)?;
        let head = self.refs().read_head()?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        match mode {
            ResetMode::Soft => {
                if index.is_conflicted() || PendingMerge::load(self.git_dir())?.is_some() {
                    return Err(RepositoryError::invalid_state(
                        "cannot do a soft reset in the middle of a merge",
                    ));
                }
            }
            ResetMode::Mixed => {
                index.load_tree(&self.database().tree_listing(Some(&target))?)?;
            }
            ResetMode::Hard => {
                let listing = self.database().tree_listing(Some(&target))?;
                self.reset_working_tree(&mut index, &listing)?;
            }
        }
        index.write_updates()?;
        if mode != ResetMode::Soft {
            PendingMerge::clear(self.git_dir())?;
        }

        if let Some(head) = &head {
            self.refs().set_orig_head(head)?;
        }
        self.refs()
            .update_head(&target, head.as_ref(), &format!("reset: moving to {revision}"))?;
        tracing::info!(?mode, %target, "reset");

        Ok(target)
    }

    /// Force every tracked path (conflicted ones included) to `target`, untracked files aside
    pub(crate) fn reset_working_tree(
        &self,
        index: &mut Index,
        target: &TreeListing,
    ) -> anyhow::Result<()> {
        let tracked = index
            .entries()
            .map(|entry| (entry.path.clone(), entry.as_database_entry()))
            .collect::<TreeListing>();

        let mut migration = Migration::new(self.database(), self.workspace(), index);
        migration.force_trees(&tracked, target)?;
        migration.apply()?;

        index.load_tree(target)
    }

    /// Undo what an interrupted merge, pick or rebase did to the index and working tree
    ///
    /// Only paths whose staged entry or conflict stages differ from `target` are rewritten;
    /// unstaged edits to files the operation never touched stay as they are.
    pub(crate) fn rollback_working_tree(
        &self,
        index: &mut Index,
        target: &TreeListing,
    ) -> anyhow::Result<()> {
        let mut touched = diff_listings(&index.listing(), target)
            .into_keys()
            .collect::<BTreeSet<_>>();
        touched.extend(index.conflicted_paths());

        let current = index
            .entries()
            .filter(|entry| touched.contains(&entry.path))
            .map(|entry| (entry.path.clone(), entry.as_database_entry()))
            .collect::<TreeListing>();
        let restored = target
            .iter()
            .filter(|(path, _)| touched.contains(*path))
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect::<TreeListing>();

        let mut migration = Migration::new(self.database(), self.workspace(), index);
        migration.force_trees(&current, &restored)?;
        migration.apply()?;
        tracing::debug!(paths = touched.len(), "rolled back working tree");

        index.load_tree(target)
    }
}
