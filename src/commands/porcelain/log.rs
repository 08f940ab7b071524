use crate::areas::repository::Repository;
use crate::artifacts::log::history::History;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;

impl Repository {
    /// Commits reachable from `revision` (HEAD by default), newest first
    ///
    /// An unborn HEAD yields an empty log rather than an error.
    pub fn log(
        &self,
        revision: Option<&str>,
        first_parent: bool,
    ) -> anyhow::Result<Vec<(ObjectId, Commit)>> {
        let start = match revision {
            Some(revision) => self.resolve(revision)?,
            None => match self.refs().read_head()? {
                Some(head) => head,
                None => return Ok(Vec::new()),
            },
        };

        History::from_database(self.database())
            .ancestors(&start, first_parent)
            .map(|oid| {
                let oid = oid?;
                let commit = self.database().load_commit(&oid)?;
                Ok((oid, commit))
            })
            .collect()
    }

    pub fn merge_base(&self, a: &str, b: &str) -> anyhow::Result<Option<ObjectId>> {
        History::from_database(self.database()).merge_base(&self.resolve(a)?, &self.resolve(b)?)
    }

    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> anyhow::Result<bool> {
        History::from_database(self.database())
            .is_ancestor(&self.resolve(ancestor)?, &self.resolve(descendant)?)
    }
}
