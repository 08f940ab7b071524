//! Tree-level three-way merge
//!
//! Every path present in the base, ours or theirs listing is classified on its own:
//! a side that left a path untouched yields to the other side, identical changes agree,
//! and divergent changes to text files fall through to the line merge in [`diff3`].
//!
//! [`diff3`]: crate::artifacts::merge::diff3

use crate::areas::config::ConflictStyle;
use crate::areas::database::Database;
use crate::artifacts::database::TreeListing;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::index::index_entry::parent_dirs;
use crate::artifacts::merge::diff3::{self, ConflictLabels};
use crate::artifacts::objects::blob::{Blob, is_binary};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both sides edited the same lines
    Content,
    /// Both sides added the path with different content
    AddAdd,
    /// One side edited the path, the other deleted it
    ModifyDelete,
    /// Both sides changed the file mode differently
    Mode,
    /// Both sides changed a binary file
    Binary,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConflictKind::Content => "content",
            ConflictKind::AddAdd => "add/add",
            ConflictKind::ModifyDelete => "modify/delete",
            ConflictKind::Mode => "mode",
            ConflictKind::Binary => "binary",
        };
        write!(f, "{label}")
    }
}

/// An unresolved path: the three index stages and what goes in the working file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConflict {
    pub kind: ConflictKind,
    pub base: Option<DatabaseEntry>,
    pub ours: Option<DatabaseEntry>,
    pub theirs: Option<DatabaseEntry>,
    pub content: Bytes,
    pub mode: FileMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeMerge {
    /// Cleanly merged paths; conflicted paths are absent
    pub resolved: TreeListing,
    pub conflicts: BTreeMap<PathBuf, PathConflict>,
}

impl TreeMerge {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

enum PathOutcome {
    Clean(Option<DatabaseEntry>),
    Conflict(PathConflict),
}

enum BlobMerge {
    Clean(ObjectId),
    Conflict(ConflictKind, Bytes),
}

pub struct Resolve<'r> {
    database: &'r Database,
    labels: ConflictLabels,
    style: ConflictStyle,
}

impl<'r> Resolve<'r> {
    pub fn new(database: &'r Database, labels: ConflictLabels, style: ConflictStyle) -> Self {
        Resolve {
            database,
            labels,
            style,
        }
    }

    /// Merge `theirs` into `ours` relative to `base`
    ///
    /// Clean blobs produced by line merges are stored; nothing else is touched, so a
    /// refused merge leaves no trace but unreferenced objects.
    pub fn merge_trees(
        &self,
        base: &TreeListing,
        ours: &TreeListing,
        theirs: &TreeListing,
    ) -> anyhow::Result<TreeMerge> {
        let paths = base
            .keys()
            .chain(ours.keys())
            .chain(theirs.keys())
            .cloned()
            .collect::<BTreeSet<_>>();

        let mut merge = TreeMerge::default();
        for path in paths {
            match self.merge_path(&path, base.get(&path), ours.get(&path), theirs.get(&path))? {
                PathOutcome::Clean(Some(entry)) => {
                    merge.resolved.insert(path, entry);
                }
                PathOutcome::Clean(None) => {}
                PathOutcome::Conflict(conflict) => {
                    tracing::debug!(path = %path.display(), kind = %conflict.kind, "merge conflict");
                    merge.conflicts.insert(path, conflict);
                }
            }
        }

        Self::check_file_directory_clash(&merge)?;
        tracing::info!(
            resolved = merge.resolved.len(),
            conflicts = merge.conflicts.len(),
            "trees merged"
        );

        Ok(merge)
    }

    fn merge_path(
        &self,
        path: &Path,
        base: Option<&DatabaseEntry>,
        ours: Option<&DatabaseEntry>,
        theirs: Option<&DatabaseEntry>,
    ) -> anyhow::Result<PathOutcome> {
        if ours == theirs || base == theirs {
            return Ok(PathOutcome::Clean(ours.cloned()));
        }
        if base == ours {
            return Ok(PathOutcome::Clean(theirs.cloned()));
        }

        match (ours, theirs) {
            (Some(ours), Some(theirs)) => self.merge_both_present(path, base, ours, theirs),
            (Some(survivor), None) | (None, Some(survivor)) => {
                tracing::trace!(path = %path.display(), "modified on one side, deleted on the other");
                Ok(PathOutcome::Conflict(PathConflict {
                    kind: ConflictKind::ModifyDelete,
                    base: base.cloned(),
                    ours: ours.cloned(),
                    theirs: theirs.cloned(),
                    content: self.database.load_blob(&survivor.oid)?.into_content(),
                    mode: FileMode::try_from(survivor.mode)?,
                }))
            }
            (None, None) => Ok(PathOutcome::Clean(None)),
        }
    }

    fn merge_both_present(
        &self,
        path: &Path,
        base: Option<&DatabaseEntry>,
        ours: &DatabaseEntry,
        theirs: &DatabaseEntry,
    ) -> anyhow::Result<PathOutcome> {
        let base_mode = base.map(|base| base.mode);
        let mode = merge_modes(base_mode, ours.mode, theirs.mode);

        // add/add merges against empty content, which is also what stage 1 records
        let base = match base {
            Some(base) => base.clone(),
            None => DatabaseEntry::new(self.database.store(&Blob::empty())?, ours.mode),
        };

        let content = if ours.oid == theirs.oid || base.oid == theirs.oid {
            BlobMerge::Clean(ours.oid.clone())
        } else if base.oid == ours.oid {
            BlobMerge::Clean(theirs.oid.clone())
        } else {
            self.merge_blobs(path, &base, ours, theirs, base_mode.is_none())?
        };

        match (content, mode) {
            (BlobMerge::Clean(oid), Some(mode)) => {
                Ok(PathOutcome::Clean(Some(DatabaseEntry::new(oid, mode))))
            }
            (content, mode) => {
                let (kind, content) = match content {
                    BlobMerge::Conflict(kind, content) => (kind, content),
                    // content merged cleanly but the modes diverged
                    BlobMerge::Clean(oid) => (
                        ConflictKind::Mode,
                        self.database.load_blob(&oid)?.into_content(),
                    ),
                };

                Ok(PathOutcome::Conflict(PathConflict {
                    kind,
                    base: Some(base),
                    ours: Some(ours.clone()),
                    theirs: Some(theirs.clone()),
                    content,
                    mode: FileMode::try_from(mode.unwrap_or(ours.mode))?,
                }))
            }
        }
    }

    /// Line-merge two divergent blobs; a clean result is stored
    fn merge_blobs(
        &self,
        path: &Path,
        base: &DatabaseEntry,
        ours: &DatabaseEntry,
        theirs: &DatabaseEntry,
        added_on_both: bool,
    ) -> anyhow::Result<BlobMerge> {
        let base_blob = self.database.load_blob(&base.oid)?;
        let ours_blob = self.database.load_blob(&ours.oid)?;
        let theirs_blob = self.database.load_blob(&theirs.oid)?;

        if [&base_blob, &ours_blob, &theirs_blob]
            .iter()
            .any(|blob| is_binary(blob.content()))
        {
            tracing::debug!(path = %path.display(), "binary content is not line-merged");
            return Ok(BlobMerge::Conflict(ConflictKind::Binary, ours_blob.into_content()));
        }

        let merged = diff3::merge(base_blob.content(), ours_blob.content(), theirs_blob.content());
        let rendered = Bytes::from(merged.render(&self.labels, self.style));

        if merged.is_clean() {
            return Ok(BlobMerge::Clean(self.database.store(&Blob::new(rendered))?));
        }

        let kind = if added_on_both {
            ConflictKind::AddAdd
        } else {
            ConflictKind::Content
        };
        Ok(BlobMerge::Conflict(kind, rendered))
    }

    /// A path cannot be a file on one side and a directory on the other
    fn check_file_directory_clash(merge: &TreeMerge) -> anyhow::Result<()> {
        let files = merge
            .resolved
            .keys()
            .chain(merge.conflicts.keys())
            .collect::<BTreeSet<_>>();

        for path in &files {
            if let Some(dir) = parent_dirs(path)
                .into_iter()
                .find(|dir| files.contains(&dir.to_path_buf()))
            {
                return Err(RepositoryError::invalid_state(format!(
                    "cannot merge: {} is a file on one side and a directory on the other",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}

/// Three-way merge of modes; `None` when both sides changed it differently
fn merge_modes(base: Option<EntryMode>, ours: EntryMode, theirs: EntryMode) -> Option<EntryMode> {
    if ours == theirs || base == Some(theirs) {
        Some(ours)
    } else if base == Some(ours) {
        Some(theirs)
    } else {
        None
    }
}
