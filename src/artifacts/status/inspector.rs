use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::workspace::Workspace;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use derive_new::new;
use std::path::Path;

/// Compares one path across HEAD, the index and the working tree
#[derive(new)]
pub struct Inspector<'r> {
    database: &'r Database,
    workspace: &'r dyn Workspace,
}

impl<'r> Inspector<'r> {
    /// Whether a working-tree directory holds anything the index does not know about
    pub fn untracked_under(&self, dir: &Path, index: &Index) -> anyhow::Result<bool> {
        let files = self.workspace.list_files_under(dir)?;
        Ok(files.iter().any(|file| !index.is_tracked(file)))
    }

    /// Working copy of `path` measured against its staged entry
    pub fn workspace_change(
        &self,
        staged: Option<&IndexEntry>,
        path: &Path,
    ) -> anyhow::Result<WorkspaceChangeType> {
        let Some(staged) = staged else {
            return Ok(if self.workspace.is_file(path) {
                WorkspaceChangeType::Untracked
            } else {
                WorkspaceChangeType::None
            });
        };

        if !self.workspace.is_file(path) {
            return Ok(WorkspaceChangeType::Deleted);
        }
        if self.workspace.file_mode(path)? != staged.mode {
            return Ok(WorkspaceChangeType::Modified);
        }

        let blob = self.workspace.parse_blob(path)?;
        Ok(if self.database.hash_object(&blob)? == staged.oid {
            WorkspaceChangeType::None
        } else {
            WorkspaceChangeType::Modified
        })
    }

    /// Staged entry measured against a committed one
    pub fn index_change(
        &self,
        staged: Option<&IndexEntry>,
        committed: Option<&DatabaseEntry>,
    ) -> IndexChangeType {
        match (staged, committed) {
            (None, None) => IndexChangeType::None,
            (Some(_), None) => IndexChangeType::Added,
            (None, Some(_)) => IndexChangeType::Deleted,
            (Some(staged), Some(committed)) => {
                let same = committed.oid == staged.oid && committed.mode == staged.entry_mode();
                if same {
                    IndexChangeType::None
                } else {
                    IndexChangeType::Modified
                }
            }
        }
    }
}
