use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::{Status, StatusInfo};

// Terminology:
// - staged: the index differs from HEAD
// - unstaged: the working tree differs from the index
// - untracked: present in the working tree, absent from the index
// - unmerged: the index still holds conflict stages for the path
impl Repository {
    pub async fn status(&self) -> anyhow::Result<StatusInfo> {
        let head_listing = self.head_listing()?;

        let index = self.index();
        let mut index = index.lock().await;
        index.rehydrate()?;

        Status::new(self.database(), self.workspace()).initialize(&index, &head_listing)
    }
}
