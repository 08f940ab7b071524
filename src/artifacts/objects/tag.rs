//! Annotated tag object
//!
//! ```text
//! object <target-oid>
//! type <target-type>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message>
//! ```
//!
//! Lightweight tags are plain refs and have no object.

use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Tag {
    target: ObjectId,
    target_type: ObjectType,
    name: String,
    tagger: Author,
    message: String,
}

impl Tag {
    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> &Author {
        &self.tagger
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Packable for Tag {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        Ok(frame(self.object_type(), self.display().as_bytes()))
    }
}

impl Unpackable for Tag {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let (headers, message) = content
            .split_once("\n\n")
            .context("Invalid tag object: missing message separator")?;

        let mut target = None;
        let mut target_type = None;
        let mut name = None;
        let mut tagger = None;

        for line in headers.lines() {
            match line.split_once(' ') {
                Some(("object", value)) => target = Some(ObjectId::try_parse(value.to_string())?),
                Some(("type", value)) => target_type = Some(ObjectType::try_from(value)?),
                Some(("tag", value)) => name = Some(value.to_string()),
                Some(("tagger", value)) => tagger = Some(Author::try_from(value)?),
                _ => anyhow::bail!("Invalid tag header line: {line}"),
            }
        }

        Ok(Tag {
            target: target.context("Invalid tag object: missing object line")?,
            target_type: target_type.context("Invalid tag object: missing type line")?,
            name: name.context("Invalid tag object: missing tag line")?,
            tagger: tagger.context("Invalid tag object: missing tagger line")?,
            message: message.to_string(),
        })
    }
}

impl Object for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn display(&self) -> String {
        format!(
            "object {}\ntype {}\ntag {}\ntagger {}\n\n{}",
            self.target,
            self.target_type,
            self.name,
            self.tagger.display(),
            self.message
        )
    }
}
