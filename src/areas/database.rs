//! Content-addressed object store
//!
//! Objects live under `.twig/objects/<first two hex chars>/<rest>` as zlib-compressed
//! `<type> <size>\0<content>` frames. The file name is the digest of the uncompressed
//! frame, so writing the same content twice lands on the same file and is a no-op.
//!
//! Reads re-hash what they decompress: a file whose bytes no longer match its name, or
//! whose header is malformed, is reported as `Corrupt` rather than parsed.

use crate::artifacts::database::TreeListing;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::hasher::ObjectHasher;
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::{Tree, TreeBuilder};
use crate::errors::RepositoryError;
use anyhow::Context;
use bytes::Bytes;
use fake::rand;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    hasher: Box<dyn ObjectHasher>,
    commit_cache: Mutex<HashMap<ObjectId, SlimCommit>>,
}

impl Database {
    pub fn new(path: Box<Path>, hasher: Box<dyn ObjectHasher>) -> Self {
        Database {
            path,
            hasher,
            commit_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn hasher(&self) -> &dyn ObjectHasher {
        self.hasher.as_ref()
    }

    /// ID an object would be stored under, without storing it
    pub fn hash_object(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        Ok(self.hasher.digest(&object.serialize()?))
    }

    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        self.write_frame(object.serialize()?)
    }

    /// Store raw content of the given kind
    ///
    /// Non-blob content must parse as that kind, so malformed trees or commits never
    /// enter the store.
    pub fn put(&self, object_type: ObjectType, content: &[u8]) -> anyhow::Result<ObjectId> {
        let framed = frame(object_type, content);
        if object_type != ObjectType::Blob {
            Self::parse_content(object_type, Cursor::new(content.to_vec()))
                .with_context(|| format!("content is not a valid {object_type}"))?;
        }

        self.write_frame(framed)
    }

    /// Kind and content (without header) of a stored object
    pub fn get(&self, oid: &ObjectId) -> anyhow::Result<(ObjectType, Bytes)> {
        let framed = self.read_verified(oid)?;
        let mut reader = Cursor::new(framed);

        let (object_type, size) = ObjectType::parse_header(&mut reader)
            .map_err(|err| RepositoryError::corrupt(oid, format!("bad header: {err}")))?;
        let start = reader.position() as usize;
        let framed = reader.into_inner();

        if framed.len() - start != size {
            return Err(RepositoryError::corrupt(
                oid,
                format!("declared size {size}, found {}", framed.len() - start),
            ));
        }

        Ok((object_type, framed.slice(start..)))
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.path.join(oid.to_path()).is_file()
    }

    pub fn object_type(&self, oid: &ObjectId) -> anyhow::Result<ObjectType> {
        Ok(self.get(oid)?.0)
    }

    pub fn parse_object(&self, oid: &ObjectId) -> anyhow::Result<ObjectBox> {
        let (object_type, content) = self.get(oid)?;

        Self::parse_content(object_type, Cursor::new(content))
            .map_err(|err| RepositoryError::corrupt(oid, err.to_string()))
    }

    fn parse_content(
        object_type: ObjectType,
        reader: Cursor<impl AsRef<[u8]>>,
    ) -> anyhow::Result<ObjectBox> {
        Ok(match object_type {
            ObjectType::Blob => ObjectBox::Blob(Box::new(Blob::deserialize(reader)?)),
            ObjectType::Tree => ObjectBox::Tree(Box::new(Tree::deserialize(reader)?)),
            ObjectType::Commit => ObjectBox::Commit(Box::new(Commit::deserialize(reader)?)),
            ObjectType::Tag => ObjectBox::Tag(Box::new(Tag::deserialize(reader)?)),
        })
    }

    pub fn load_blob(&self, oid: &ObjectId) -> anyhow::Result<Blob> {
        match self.parse_object(oid)? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Self::wrong_type(oid, ObjectType::Blob, other.object_type())),
        }
    }

    pub fn load_tree(&self, oid: &ObjectId) -> anyhow::Result<Tree> {
        match self.parse_object(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            other => Err(Self::wrong_type(oid, ObjectType::Tree, other.object_type())),
        }
    }

    pub fn load_commit(&self, oid: &ObjectId) -> anyhow::Result<Commit> {
        match self.parse_object(oid)? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Self::wrong_type(oid, ObjectType::Commit, other.object_type())),
        }
    }

    pub fn load_tag(&self, oid: &ObjectId) -> anyhow::Result<Tag> {
        match self.parse_object(oid)? {
            ObjectBox::Tag(tag) => Ok(*tag),
            other => Err(Self::wrong_type(oid, ObjectType::Tag, other.object_type())),
        }
    }

    fn wrong_type(oid: &ObjectId, wanted: ObjectType, found: ObjectType) -> anyhow::Error {
        RepositoryError::invalid_state(format!(
            "object {} is a {found}, not a {wanted}",
            oid.to_short_oid()
        ))
    }

    /// Follow annotated tags until reaching a commit
    pub fn peel_to_commit(&self, oid: &ObjectId) -> anyhow::Result<ObjectId> {
        let mut current = oid.clone();
        loop {
            match self.parse_object(&current)? {
                ObjectBox::Commit(_) => return Ok(current),
                ObjectBox::Tag(tag) => current = tag.target().clone(),
                other => {
                    return Err(Self::wrong_type(
                        oid,
                        ObjectType::Commit,
                        other.object_type(),
                    ));
                }
            }
        }
    }

    /// Graph-walk view of a commit, cached since commits never change
    pub fn slim_commit(&self, oid: &ObjectId) -> anyhow::Result<SlimCommit> {
        if let Some(slim) = self.commit_cache.lock().get(oid) {
            return Ok(slim.clone());
        }

        let slim = self.load_commit(oid)?.slim(oid.clone());
        self.commit_cache.lock().insert(oid.clone(), slim.clone());

        Ok(slim)
    }

    /// Every blob under a tree keyed by full path; accepts a tree, a commit or a tag.
    /// `None` is the empty tree.
    pub fn tree_listing(&self, oid: Option<&ObjectId>) -> anyhow::Result<TreeListing> {
        let mut listing = TreeListing::new();
        if let Some(oid) = oid {
            let tree_oid = self.resolve_tree_oid(oid)?;
            self.flatten_tree(&tree_oid, PathBuf::new(), &mut listing)?;
        }

        Ok(listing)
    }

    fn resolve_tree_oid(&self, oid: &ObjectId) -> anyhow::Result<ObjectId> {
        match self.parse_object(oid)? {
            ObjectBox::Tree(_) => Ok(oid.clone()),
            ObjectBox::Commit(commit) => Ok(commit.tree_oid().clone()),
            ObjectBox::Tag(tag) => self.resolve_tree_oid(tag.target()),
            ObjectBox::Blob(_) => Err(Self::wrong_type(oid, ObjectType::Tree, ObjectType::Blob)),
        }
    }

    fn flatten_tree(
        &self,
        tree_oid: &ObjectId,
        prefix: PathBuf,
        listing: &mut TreeListing,
    ) -> anyhow::Result<()> {
        for (name, entry) in self.load_tree(tree_oid)?.into_entries() {
            let path = prefix.join(name);
            if entry.is_tree() {
                self.flatten_tree(&entry.oid, path, listing)?;
            } else {
                listing.insert(path, entry);
            }
        }

        Ok(())
    }

    /// Build and store nested trees for a flat listing, returning the root tree
    pub fn write_tree(&self, listing: &TreeListing) -> anyhow::Result<ObjectId> {
        let builder = TreeBuilder::build(listing.iter().map(|(path, entry)| (path.as_path(), entry)))?;
        builder.traverse(&|tree: &Tree| self.store(tree))
    }

    /// Lazily walk every object reachable from `roots`, each yielded once
    pub fn walk_reachable(&self, roots: impl IntoIterator<Item = ObjectId>) -> ReachableObjects<'_> {
        ReachableObjects {
            database: self,
            pending: roots.into_iter().collect(),
            seen: HashSet::new(),
        }
    }

    /// Every object file in the store
    pub fn all_objects(&self) -> anyhow::Result<Vec<ObjectId>> {
        let mut oids = Vec::new();
        if !self.path.exists() {
            return Ok(oids);
        }

        for dir in std::fs::read_dir(&self.path)? {
            let dir = dir?;
            let dir_name = dir.file_name().to_string_lossy().to_string();
            if dir_name.len() != 2 || !dir.file_type()?.is_dir() {
                continue;
            }

            for file in std::fs::read_dir(dir.path())? {
                let file_name = file?.file_name().to_string_lossy().to_string();
                if let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}")) {
                    oids.push(oid);
                }
            }
        }
        oids.sort();

        Ok(oids)
    }

    pub fn delete(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let object_path = self.path.join(oid.to_path());
        std::fs::remove_file(&object_path)
            .with_context(|| format!("Unable to delete object {}", object_path.display()))?;
        self.commit_cache.lock().remove(oid);

        if let Some(dir) = object_path.parent()
            && dir.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(dir)?;
        }

        Ok(())
    }

    /// Find all objects whose ID starts with the given hex prefix
    pub fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        let mut matches = Vec::new();

        if prefix.len() >= 2 {
            let (dir_name, file_prefix) = prefix.split_at(2);
            let dir_path = self.path.join(dir_name);

            if dir_path.is_dir() {
                for entry in std::fs::read_dir(&dir_path)? {
                    let file_name = entry?.file_name().to_string_lossy().to_string();

                    if file_name.starts_with(file_prefix)
                        && let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}"))
                    {
                        matches.push(oid);
                    }
                }
            }
            matches.sort();
        } else {
            matches = self
                .all_objects()?
                .into_iter()
                .filter(|oid| oid.starts_with(&prefix))
                .collect();
        }

        Ok(matches)
    }

    fn write_frame(&self, framed: Bytes) -> anyhow::Result<ObjectId> {
        let oid = self.hasher.digest(&framed);
        let object_path = self.path.join(oid.to_path());

        if object_path.exists() {
            tracing::trace!(%oid, "object already stored");
            return Ok(oid);
        }

        let object_dir = object_path
            .parent()
            .with_context(|| format!("Invalid object path {}", object_path.display()))?;
        std::fs::create_dir_all(object_dir).with_context(|| {
            format!("Unable to create object directory {}", object_dir.display())
        })?;

        let temp_object_path = object_dir.join(format!("tmp-obj-{}", rand::random::<u32>()));
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)
            .with_context(|| format!("Unable to open object file {}", temp_object_path.display()))?;
        file.write_all(&Self::compress(&framed)?)
            .with_context(|| format!("Unable to write object file {}", temp_object_path.display()))?;

        // rename is atomic; a concurrent writer of the same content produces identical bytes
        std::fs::rename(&temp_object_path, &object_path)
            .with_context(|| format!("Unable to rename object file to {}", object_path.display()))?;

        tracing::trace!(%oid, size = framed.len(), "object stored");
        Ok(oid)
    }

    fn read_verified(&self, oid: &ObjectId) -> anyhow::Result<Bytes> {
        let object_path = self.path.join(oid.to_path());
        let compressed = match std::fs::read(&object_path) {
            Ok(compressed) => compressed,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::not_found("object", oid));
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Unable to read object file {}", object_path.display())
                });
            }
        };

        let framed = Self::decompress(&compressed)
            .map_err(|err| RepositoryError::corrupt(oid, err.to_string()))?;

        let actual = self.hasher.digest(&framed);
        if &actual != oid {
            return Err(RepositoryError::corrupt(oid, format!("content hashes to {actual}")));
        }

        Ok(framed)
    }

    fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }
}

/// Iterator over the objects reachable from a set of roots
///
/// Commits lead to their tree and parents, trees to their entries, tags to their target.
/// A missing or corrupt object is yielded as an error and not descended into.
pub struct ReachableObjects<'d> {
    database: &'d Database,
    pending: Vec<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl Iterator for ReachableObjects<'_> {
    type Item = anyhow::Result<ObjectId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let oid = self.pending.pop()?;
            if !self.seen.insert(oid.clone()) {
                continue;
            }

            let object = match self.database.parse_object(&oid) {
                Ok(object) => object,
                Err(err) => return Some(Err(err)),
            };

            match object {
                ObjectBox::Commit(commit) => {
                    self.pending.extend(commit.parents().iter().rev().cloned());
                    self.pending.push(commit.tree_oid().clone());
                }
                ObjectBox::Tree(tree) => {
                    self.pending
                        .extend(tree.into_entries().map(|(_, DatabaseEntry { oid, .. })| oid));
                }
                ObjectBox::Tag(tag) => self.pending.push(tag.target().clone()),
                ObjectBox::Blob(_) => {}
            }

            return Some(Ok(oid));
        }
    }
}
