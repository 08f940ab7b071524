use crate::artifacts::database::TreeListing;
use crate::artifacts::database::database_entry::DatabaseEntry;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How one path differs between two flattened trees
#[derive(Debug, Clone, PartialEq)]
pub enum TreeChange {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified { old: DatabaseEntry, new: DatabaseEntry },
}

impl TreeChange {
    fn between(old: Option<&DatabaseEntry>, new: Option<&DatabaseEntry>) -> Option<Self> {
        match (old.cloned(), new.cloned()) {
            (Some(old), Some(new)) if old == new => None,
            (Some(old), Some(new)) => Some(TreeChange::Modified { old, new }),
            (Some(old), None) => Some(TreeChange::Deleted(old)),
            (None, Some(new)) => Some(TreeChange::Added(new)),
            (None, None) => None,
        }
    }

    pub fn before(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChange::Added(_) => None,
            TreeChange::Deleted(old) | TreeChange::Modified { old, .. } => Some(old),
        }
    }

    pub fn after(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChange::Deleted(_) => None,
            TreeChange::Added(new) | TreeChange::Modified { new, .. } => Some(new),
        }
    }
}

pub type ChangeSet = BTreeMap<PathBuf, TreeChange>;

/// Paths whose entry (blob id or mode) differs between `old` and `new`
pub fn diff_listings(old: &TreeListing, new: &TreeListing) -> ChangeSet {
    old.keys()
        .chain(new.keys())
        .filter_map(|path| {
            TreeChange::between(old.get(path), new.get(path)).map(|change| (path.clone(), change))
        })
        .collect()
}
