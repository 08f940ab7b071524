use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::{RefKind, RefName, SymRefName};
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tag::Tag;
use crate::commands::plumbing::commit_tree::normalize_message;
use crate::errors::RepositoryError;

impl Repository {
    /// Tag `target` (HEAD by default)
    ///
    /// With a message an annotated tag object is stored and the ref points at it;
    /// otherwise the ref points straight at the target.
    pub fn create_tag(
        &self,
        name: &str,
        target: Option<&str>,
        message: Option<&str>,
    ) -> anyhow::Result<SymRefName> {
        let name = RefName::try_parse(name.to_string())?;
        let target = Revision::resolve_object(target.unwrap_or("HEAD"), self)?;

        let tagged = match message {
            Some(message) => {
                let tag = Tag::new(
                    target.clone(),
                    self.database().object_type(&target)?,
                    name.to_string(),
                    self.author()?,
                    normalize_message(message),
                );
                self.database().store(&tag)?
            }
            None => target,
        };

        let _lock = self.lock()?;
        self.refs()
            .create_ref(&name, RefKind::Tag, &tagged, &format!("tag: {name}"))
    }

    pub fn list_tags(&self) -> anyhow::Result<Vec<(SymRefName, ObjectId)>> {
        let mut tags = Vec::new();
        for tag in self.refs().list_tags()? {
            if let Some(oid) = self.refs().read_ref(&tag)? {
                tags.push((tag, oid));
            }
        }

        Ok(tags)
    }

    pub fn delete_tag(&self, name: &str) -> anyhow::Result<ObjectId> {
        let tag = RefName::try_parse(name.to_string())?.qualify(RefKind::Tag);
        let _lock = self.lock()?;

        if self.refs().read_ref(&tag)?.is_none() {
            return Err(RepositoryError::not_found("tag", name));
        }
        self.refs().delete_ref(&tag, "tag: deleted")
    }
}
