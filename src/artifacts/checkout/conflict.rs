use crate::artifacts::index::index_entry::IndexEntry;
use std::path::PathBuf;

/// Why a path blocks a working-tree migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictType {
    /// Tracked path with uncommitted changes
    StaleFile,
    /// Directory with untracked content where a file must be written
    StaleDirectory,
    UntrackedOverwritten,
    UntrackedRemoved,
}

impl ConflictType {
    /// Pick the reason for a blocked path from what occupies it
    pub fn classify(tracked: Option<&IndexEntry>, occupied_by_dir: bool, writes_file: bool) -> Self {
        match (tracked, occupied_by_dir, writes_file) {
            (Some(_), _, _) => ConflictType::StaleFile,
            (None, true, _) => ConflictType::StaleDirectory,
            (None, false, true) => ConflictType::UntrackedOverwritten,
            (None, false, false) => ConflictType::UntrackedRemoved,
        }
    }

    pub fn header(self, operation: &str) -> String {
        match self {
            ConflictType::StaleFile => {
                format!("Your local changes to the following files would be overwritten by {operation}:")
            }
            ConflictType::StaleDirectory => {
                "Updating the following directories would lose untracked files in them:".to_string()
            }
            ConflictType::UntrackedOverwritten => format!(
                "The following untracked working tree files would be overwritten by {operation}:"
            ),
            ConflictType::UntrackedRemoved => {
                format!("The following untracked working tree files would be removed by {operation}:")
            }
        }
    }

    pub fn footer(self, operation: &str) -> Option<String> {
        match self {
            ConflictType::StaleFile => Some(format!(
                "Please commit your changes or stash them before you {operation}."
            )),
            ConflictType::StaleDirectory => None,
            ConflictType::UntrackedOverwritten | ConflictType::UntrackedRemoved => {
                Some(format!("Please move or remove them before you {operation}."))
            }
        }
    }

    /// Full refusal block listing `paths`
    pub fn report<'p>(self, operation: &str, paths: impl IntoIterator<Item = &'p PathBuf>) -> String {
        let mut lines = vec![self.header(operation)];
        lines.extend(paths.into_iter().map(|path| format!("\t{}", path.display())));
        lines.extend(self.footer(operation));
        lines.join("\n")
    }
}
