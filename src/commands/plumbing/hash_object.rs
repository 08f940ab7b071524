use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;
use std::path::Path;

impl Repository {
    /// ID `content` has as a blob; it is stored only when `write` is set
    pub fn hash_object(&self, content: &[u8], write: bool) -> anyhow::Result<ObjectId> {
        let blob = Blob::new(Bytes::copy_from_slice(content));

        if write {
            self.database().store(&blob)
        } else {
            self.database().hash_object(&blob)
        }
    }

    /// [`Repository::hash_object`] for a file of the working tree
    pub fn hash_file(&self, path: &Path, write: bool) -> anyhow::Result<ObjectId> {
        let content = self.workspace().read_file(path)?;
        self.hash_object(&content, write)
    }
}
