//! Tree object
//!
//! Trees are directory snapshots: an ordered list of named entries pointing at blobs or
//! nested trees.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`, one entry per name in byte order of the name:
//! `<octal-mode> <name>\0<hex-oid>\n`
//!
//! ## Building
//!
//! [`TreeBuilder`] turns a flat `path -> entry` listing (the index, or a merge result)
//! into nested trees. Children are stored before their parents so that every tree only
//! references objects that already exist.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Component, Path};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, DatabaseEntry>,
}

impl Tree {
    pub fn new(entries: BTreeMap<String, DatabaseEntry>) -> Self {
        Tree { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &DatabaseEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, DatabaseEntry)> {
        self.entries.into_iter()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for (name, entry) in &self.entries {
            content.extend_from_slice(format!("{:o} {}", entry.mode.as_u32(), name).as_bytes());
            content.push(0);
            content.extend_from_slice(entry.oid.as_ref().as_bytes());
            content.push(b'\n');
        }

        Ok(frame(self.object_type(), &content))
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();

        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();
        let mut oid_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            if reader.read_until(b' ', &mut mode_bytes)? == 0 {
                break;
            }
            if mode_bytes.pop() != Some(b' ') {
                anyhow::bail!("unexpected EOF in mode");
            }
            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                anyhow::bail!("unexpected EOF in name");
            }
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            oid_bytes.clear();
            reader.read_until(b'\n', &mut oid_bytes)?;
            if oid_bytes.pop() != Some(b'\n') {
                anyhow::bail!("unexpected EOF in object id");
            }
            let oid = ObjectId::try_parse(String::from_utf8(oid_bytes.clone())?)
                .context("malformed object id in tree entry")?;

            entries.insert(name, DatabaseEntry::new(oid, mode));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let object_type = if entry.is_tree() {
                    ObjectType::Tree
                } else {
                    ObjectType::Blob
                };
                format!("{} {} {}\t{}", entry.mode.as_str(), object_type, entry.oid, name)
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[derive(Debug, Clone)]
enum BuilderNode {
    Leaf(DatabaseEntry),
    Subtree(TreeBuilder),
}

/// Nested tree under construction, built from a flat listing of files
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    nodes: BTreeMap<String, BuilderNode>,
}

impl TreeBuilder {
    pub fn build<'e>(
        listing: impl IntoIterator<Item = (&'e Path, &'e DatabaseEntry)>,
    ) -> anyhow::Result<Self> {
        let mut root = Self::default();

        for (path, entry) in listing {
            let components = path
                .components()
                .map(|component| match component {
                    Component::Normal(name) => name
                        .to_str()
                        .map(str::to_owned)
                        .with_context(|| format!("non UTF-8 path {}", path.display())),
                    _ => Err(anyhow::anyhow!("unsupported path {}", path.display())),
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            root.insert(&components, entry.clone())
                .with_context(|| format!("cannot place {} in tree", path.display()))?;
        }

        Ok(root)
    }

    fn insert(&mut self, components: &[String], entry: DatabaseEntry) -> anyhow::Result<()> {
        match components {
            [] => anyhow::bail!("empty path"),
            [name] => {
                if let Some(BuilderNode::Subtree(_)) = self.nodes.get(name) {
                    anyhow::bail!("{name} is both a file and a directory");
                }
                self.nodes.insert(name.clone(), BuilderNode::Leaf(entry));
                Ok(())
            }
            [dir, rest @ ..] => {
                let node = self
                    .nodes
                    .entry(dir.clone())
                    .or_insert_with(|| BuilderNode::Subtree(TreeBuilder::default()));

                match node {
                    BuilderNode::Subtree(subtree) => subtree.insert(rest, entry),
                    BuilderNode::Leaf(_) => anyhow::bail!("{dir} is both a file and a directory"),
                }
            }
        }
    }

    /// Store every tree bottom-up through `store`, returning the root tree's ID
    pub fn traverse<F>(&self, store: &F) -> anyhow::Result<ObjectId>
    where
        F: Fn(&Tree) -> anyhow::Result<ObjectId>,
    {
        let mut entries = BTreeMap::new();

        for (name, node) in &self.nodes {
            let entry = match node {
                BuilderNode::Leaf(entry) => entry.clone(),
                BuilderNode::Subtree(subtree) => {
                    DatabaseEntry::new(subtree.traverse(store)?, EntryMode::Directory)
                }
            };
            entries.insert(name.clone(), entry);
        }

        store(&Tree::new(entries))
    }
}
