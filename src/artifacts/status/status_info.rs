use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::workspace::Workspace;
use crate::artifacts::database::TreeListing;
use crate::artifacts::index::index_entry::parent_dirs;
use crate::artifacts::status::file_change::{FileChange, IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::inspector::Inspector;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub type FileSet = BTreeSet<PathBuf>;

/// Snapshot of how HEAD, the index and the working tree differ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusInfo {
    /// HEAD vs index
    pub staged: BTreeMap<PathBuf, IndexChangeType>,
    /// Index vs working tree
    pub unstaged: BTreeMap<PathBuf, WorkspaceChangeType>,
    /// Untracked files; a directory without any tracked file is listed once, with a
    /// trailing separator
    pub untracked: FileSet,
    /// Paths with unresolved conflict stages
    pub unmerged: FileSet,
}

impl StatusInfo {
    /// Nothing staged, modified or conflicted; untracked files do not count
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.unmerged.is_empty()
    }

    /// Per-path two-column view, as printed by `status --porcelain`
    pub fn changed_files(&self) -> BTreeMap<PathBuf, FileChange> {
        let mut changed_files = BTreeMap::<PathBuf, FileChange>::new();
        for (path, change) in &self.staged {
            changed_files.entry(path.clone()).or_default().index_change = *change;
        }
        for (path, change) in &self.unstaged {
            changed_files.entry(path.clone()).or_default().workspace_change = *change;
        }
        for path in &self.untracked {
            changed_files.entry(path.clone()).or_default().workspace_change =
                WorkspaceChangeType::Untracked;
        }

        changed_files
    }
}

#[derive(new)]
pub struct Status<'r> {
    database: &'r Database,
    workspace: &'r dyn Workspace,
}

impl<'r> Status<'r> {
    pub fn initialize(&self, index: &Index, head_tree: &TreeListing) -> anyhow::Result<StatusInfo> {
        let inspector = Inspector::new(self.database, self.workspace);
        let unmerged = index.conflicted_paths();

        let mut staged = BTreeMap::new();
        let mut unstaged = BTreeMap::new();

        for path in index.tracked_paths() {
            if unmerged.contains(&path) {
                continue;
            }

            let entry = index.entry_by_path(&path);
            let index_change = inspector.index_change(entry, head_tree.get(&path));
            if index_change != IndexChangeType::None {
                staged.insert(path.clone(), index_change);
            }

            let workspace_change = inspector.workspace_change(entry, &path)?;
            if workspace_change != WorkspaceChangeType::None {
                unstaged.insert(path, workspace_change);
            }
        }

        for path in head_tree.keys() {
            if !index.is_tracked(path) {
                staged.insert(path.clone(), IndexChangeType::Deleted);
            }
        }

        let untracked = self.scan_untracked(index)?;

        Ok(StatusInfo {
            staged,
            unstaged,
            untracked,
            unmerged,
        })
    }

    fn scan_untracked(&self, index: &Index) -> anyhow::Result<FileSet> {
        let mut untracked_files = FileSet::new();

        for path in self.workspace.list_files()? {
            if index.is_tracked(&path) {
                continue;
            }

            let untracked_dir = parent_dirs(&path)
                .into_iter()
                .find(|dir| !index.is_directly_tracked(dir));

            match untracked_dir {
                Some(dir) => {
                    // trailing separator marks a directory
                    let mut dir = dir.to_path_buf();
                    dir.push("");
                    untracked_files.insert(dir);
                }
                None => {
                    untracked_files.insert(path);
                }
            }
        }

        Ok(untracked_files)
    }
}
