use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;

impl Repository {
    /// Parse the object a ref, revision or (abbreviated) ID names, without peeling tags
    pub fn cat_file(&self, name: &str) -> anyhow::Result<(ObjectId, ObjectBox)> {
        let oid = Revision::resolve_object(name, self)?;
        let object = self.database().parse_object(&oid)?;

        Ok((oid, object))
    }
}
