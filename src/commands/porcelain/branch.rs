use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::{RefKind, RefName, SymRefName};
use crate::artifacts::log::history::History;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;

impl Repository {
    /// Create a branch at `start` (HEAD by default)
    pub fn create_branch(&self, name: &str, start: Option<&str>) -> anyhow::Result<SymRefName> {
        let name = RefName::try_parse(name.to_string())?;
        let (start_name, start_oid) = match start {
            Some(start) => (start.to_string(), self.resolve(start)?),
            None => {
                let head = self.refs().read_head()?.ok_or_else(|| {
                    RepositoryError::invalid_state("no commit on HEAD to branch from")
                })?;
                ("HEAD".to_string(), head)
            }
        };

        let _lock = self.lock()?;
        self.refs().create_ref(
            &name,
            RefKind::Branch,
            &start_oid,
            &format!("branch: Created from {start_name}"),
        )
    }

    pub fn list_branches(&self) -> anyhow::Result<Vec<(SymRefName, ObjectId)>> {
        let mut branches = Vec::new();
        for branch in self.refs().list_branches()? {
            if let Some(oid) = self.refs().read_ref(&branch)? {
                branches.push((branch, oid));
            }
        }

        Ok(branches)
    }

    /// Delete a branch, returning the commit it pointed at
    ///
    /// Without `force` the branch must be merged into HEAD. Its reflog survives.
    pub fn delete_branch(&self, name: &str, force: bool) -> anyhow::Result<ObjectId> {
        let branch = RefName::try_parse(name.to_string())?.qualify(RefKind::Branch);
        let _lock = self.lock()?;

        let tip = self
            .refs()
            .read_ref(&branch)?
            .ok_or_else(|| RepositoryError::not_found("branch", name))?;
        if self.refs().is_current_branch(&branch)? {
            return Err(RepositoryError::invalid_state(format!(
                "cannot delete branch '{name}' checked out at HEAD"
            )));
        }

        if !force {
            let merged = match self.refs().read_head()? {
                Some(head) => History::from_database(self.database()).is_ancestor(&tip, &head)?,
                None => false,
            };
            if !merged {
                return Err(RepositoryError::invalid_state(format!(
                    "the branch '{name}' is not fully merged; force the deletion to discard it"
                )));
            }
        }

        self.refs().delete_ref(&branch, "branch: deleted")
    }
}
