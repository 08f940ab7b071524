use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::database::TreeListing;

impl Repository {
    /// Every file under a tree, commit or tag, keyed by full path
    pub fn ls_tree(&self, name: &str) -> anyhow::Result<TreeListing> {
        let oid = Revision::resolve_object(name, self)?;
        self.database().tree_listing(Some(&oid))
    }
}
