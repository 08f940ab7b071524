use crate::areas::repository::Repository;
use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::index::index_entry::{IndexEntry, Stage};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

impl Repository {
    /// Stage working-tree paths; directories expand to the files below them
    ///
    /// Tracked files that no longer exist in the working tree are removed from the index.
    /// A path matching neither a file nor a tracked entry is `NotFound`, and nothing is
    /// staged.
    pub async fn add(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let mut files = BTreeSet::new();
        let mut vanished = BTreeSet::new();
        for path in paths {
            let present = self.workspace().list_files_under(path)?;
            let tracked = index.entries_under_path(path);
            if present.is_empty() && tracked.is_empty() {
                return Err(RepositoryError::not_found("pathspec", path.display()));
            }

            vanished.extend(
                tracked
                    .into_iter()
                    .filter(|tracked| !self.workspace().is_file(tracked)),
            );
            files.extend(present);
        }

        for path in files {
            let blob = self.workspace().parse_blob(&path)?;
            let oid = self.database().store(&blob)?;
            let mode = self.workspace().file_mode(&path)?;
            index.add(IndexEntry::new(path, oid, mode));
        }
        for path in &vanished {
            tracing::debug!(path = %path.display(), "removing vanished file from index");
            index.remove(path);
        }

        index.write_updates()?;

        Ok(())
    }

    /// Stage `content` at `path` directly, without reading the working tree
    pub async fn stage(&self, path: &Path, content: &[u8]) -> anyhow::Result<ObjectId> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let mode = index
            .entry_by_path(path)
            .map(|entry| entry.mode)
            .unwrap_or(FileMode::Regular);
        let oid = self
            .database()
            .store(&Blob::new(Bytes::copy_from_slice(content)))?;
        index.add(IndexEntry::new(path.to_path_buf(), oid.clone(), mode));

        index.write_updates()?;

        Ok(oid)
    }

    /// Put the HEAD version of `path` back in the index, or drop it if HEAD lacks it
    ///
    /// The working tree is left alone, so the change shows up as unstaged.
    pub async fn unstage(&self, path: &Path) -> anyhow::Result<()> {
        let head_listing = self.head_listing()?;

        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let mut touched = false;
        for tracked in index.entries_under_path(path) {
            index.remove(&tracked);
            touched = true;
        }
        for (head_path, entry) in head_listing
            .iter()
            .filter(|(head_path, _)| path == Path::new(".") || head_path.starts_with(path))
        {
            index.add(IndexEntry::conflicted(head_path.clone(), entry, Stage::Normal)?);
            touched = true;
        }

        if !touched {
            return Err(RepositoryError::not_found("pathspec", path.display()));
        }
        index.write_updates()?;

        Ok(())
    }

    /// Stop tracking paths, deleting them from the working tree unless `cached`
    pub async fn rm(&self, paths: &[PathBuf], cached: bool) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let mut removed = Vec::new();
        for path in paths {
            let tracked = index.entries_under_path(path);
            if tracked.is_empty() {
                return Err(RepositoryError::not_found("pathspec", path.display()));
            }
            removed.extend(tracked);
        }

        for path in &removed {
            index.remove(path);
            if !cached {
                self.workspace().remove_file(path)?;
            }
        }

        index.write_updates()?;

        Ok(())
    }
}
