use crate::areas::reflog::ReflogEntry;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::SymRefName;
use crate::errors::RepositoryError;

impl Repository {
    /// History of a ref, newest first
    ///
    /// Deleted refs keep their log, so `name` is looked up among the logs when no live ref
    /// matches.
    pub fn reflog(&self, name: &str) -> anyhow::Result<Vec<ReflogEntry>> {
        let sym_ref = match self.refs().find_ref(name) {
            Some(sym_ref) => sym_ref,
            None => self
                .refs()
                .reflog()
                .ref_names()
                .into_iter()
                .find(|logged| logged.as_ref_path() == name || logged.short_name() == name)
                .ok_or_else(|| RepositoryError::not_found("reflog", name))?,
        };

        let mut entries = self.refs().reflog().read(&sym_ref)?;
        entries.reverse();

        Ok(entries)
    }

    pub fn head_reflog(&self) -> anyhow::Result<Vec<ReflogEntry>> {
        let mut entries = self.refs().reflog().read(&SymRefName::head())?;
        entries.reverse();

        Ok(entries)
    }
}
