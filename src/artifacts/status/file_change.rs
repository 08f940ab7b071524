use colored::{ColoredString, Colorize};
use std::fmt;

/// Difference between the working tree and the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WorkspaceChangeType {
    #[default]
    None,
    Untracked,
    Modified,
    Deleted,
}

impl WorkspaceChangeType {
    /// Right-hand porcelain column
    pub fn code(self) -> char {
        match self {
            WorkspaceChangeType::None => ' ',
            WorkspaceChangeType::Untracked => '?',
            WorkspaceChangeType::Modified => 'M',
            WorkspaceChangeType::Deleted => 'D',
        }
    }
}

/// Difference between the index and HEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum IndexChangeType {
    #[default]
    None,
    Added,
    Modified,
    Deleted,
}

impl IndexChangeType {
    /// Left-hand porcelain column
    pub fn code(self) -> char {
        match self {
            IndexChangeType::None => ' ',
            IndexChangeType::Added => 'A',
            IndexChangeType::Modified => 'M',
            IndexChangeType::Deleted => 'D',
        }
    }
}

/// A row of the long status listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileChangeType {
    Workspace(WorkspaceChangeType),
    Index(IndexChangeType),
    Unmerged,
}

impl FileChangeType {
    fn label(self) -> ColoredString {
        let label = match self {
            FileChangeType::Workspace(WorkspaceChangeType::None | WorkspaceChangeType::Untracked)
            | FileChangeType::Index(IndexChangeType::None) => return "".normal(),
            FileChangeType::Unmerged => "both modified:",
            FileChangeType::Index(IndexChangeType::Added) => "new file:",
            FileChangeType::Workspace(WorkspaceChangeType::Modified)
            | FileChangeType::Index(IndexChangeType::Modified) => "modified:",
            FileChangeType::Workspace(WorkspaceChangeType::Deleted)
            | FileChangeType::Index(IndexChangeType::Deleted) => "deleted:",
        };
        let label = format!("{label:<width$}", width = label.len().max(9) + 3);

        match self {
            FileChangeType::Index(_) => label.green(),
            _ => label.red(),
        }
    }
}

impl fmt::Display for FileChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\t{}", self.label())
    }
}

/// Two-letter porcelain code: index column, then working-tree column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileChange {
    pub index_change: IndexChangeType,
    pub workspace_change: WorkspaceChangeType,
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.workspace_change {
            WorkspaceChangeType::Untracked => f.write_str("??"),
            workspace => write!(f, "{}{}", self.index_change.code(), workspace.code()),
        }
    }
}
