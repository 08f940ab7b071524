//! Staging area
//!
//! The index maps `(path, stage)` to a staged blob. Normal entries sit at stage 0; while
//! a merge conflict is unresolved a path instead has entries at stages 1 (base), 2 (ours)
//! and 3 (theirs), and the index cannot be turned into a tree.
//!
//! The index is persisted to `.twig/index` (format in [`crate::artifacts::index`]). The
//! in-memory copy is reloaded with [`Index::rehydrate`] at the start of an operation and
//! flushed with [`Index::write_updates`] at the end.

use crate::artifacts::database::TreeListing;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{IndexEntry, Stage, parent_dirs};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::HEADER_SIZE;
use crate::artifacts::objects::object::Packable;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to `.twig/index`
    path: Box<Path>,
    entries: BTreeMap<(PathBuf, Stage), IndexEntry>,
    /// Directory -> tracked paths below it
    children: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_changes(&self) -> bool {
        self.changed
    }

    /// The stage-0 entry for a path
    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(&(path.to_path_buf(), Stage::Normal))
    }

    /// Entries at every stage for a path, ordered by stage
    pub fn entries_for(&self, path: &Path) -> Vec<&IndexEntry> {
        self.entries
            .range((path.to_path_buf(), Stage::Normal)..=(path.to_path_buf(), Stage::Theirs))
            .map(|(_, entry)| entry)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.changed = true;
    }

    /// Reload from disk; a missing or empty file is an empty index
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.children.clear();
        self.changed = false;

        if !self.path.exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("Unable to open index {}", self.path.display()))?;
        let lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        if lock.metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(std::io::BufReader::new(&**lock));
        let entries_count = Self::parse_header(&mut reader)?;
        for _ in 0..entries_count {
            let entry = IndexEntry::read_from(&mut reader)?;
            self.store_entry(entry);
        }

        reader.verify()
    }

    fn parse_header<R: Read>(reader: &mut Checksum<R>) -> anyhow::Result<u32> {
        let header = IndexHeader::parse(&reader.read(HEADER_SIZE)?)?;
        Ok(header.entries)
    }

    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        if !self.changed && self.path.exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .with_context(|| format!("Unable to open index {}", self.path.display()))?;
        let lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)?;

        let mut writer = Checksum::new(std::io::BufWriter::new(&**lock));

        writer.write(&IndexHeader::for_entries(self.entries.len())?.to_bytes()?)?;

        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }

        let mut buffered = writer.write_checksum()?;
        std::io::Write::flush(&mut buffered).context("Unable to flush index")?;
        self.changed = false;

        tracing::trace!(entries = self.entries.len(), "index written");
        Ok(())
    }

    /// Stage a path at slot 0, resolving any conflict on it
    ///
    /// A file replaces any directory of the same name and vice versa.
    pub fn add(&mut self, entry: IndexEntry) {
        let entry = IndexEntry {
            stage: Stage::Normal,
            ..entry
        };

        self.discard_conflicts(&entry.path);
        self.store_entry(entry);
        self.changed = true;
    }

    /// Record an unresolved conflict; any side may be missing
    pub fn add_conflict(
        &mut self,
        path: &Path,
        base: Option<&DatabaseEntry>,
        ours: Option<&DatabaseEntry>,
        theirs: Option<&DatabaseEntry>,
    ) -> anyhow::Result<()> {
        self.discard_conflicts(path);

        for (stage, side) in [(Stage::Base, base), (Stage::Ours, ours), (Stage::Theirs, theirs)] {
            if let Some(side) = side {
                self.store_entry(IndexEntry::conflicted(path.to_path_buf(), side, stage)?);
            }
        }
        self.changed = true;

        Ok(())
    }

    /// Remove a path (every stage) or everything under a directory
    pub fn remove(&mut self, path: &Path) {
        self.remove_entry(path);
        self.remove_children(path);
        self.changed = true;
    }

    fn discard_conflicts(&mut self, path: &Path) {
        for parent in parent_dirs(path) {
            self.remove_entry(parent);
        }
        self.remove_children(path);
        self.remove_entry(path);
    }

    fn store_entry(&mut self, entry: IndexEntry) {
        for parent in entry.parent_dirs() {
            self.children
                .entry(parent.to_path_buf())
                .or_default()
                .insert(entry.path.clone());
        }

        self.entries
            .insert((entry.path.clone(), entry.stage), entry);
    }

    fn remove_children(&mut self, path: &Path) {
        if let Some(children) = self.children.remove(path) {
            for child in children {
                self.remove_entry(&child);
            }
        }
    }

    fn remove_entry(&mut self, path: &Path) {
        let stages = self
            .entries_for(path)
            .iter()
            .map(|entry| entry.stage)
            .collect::<Vec<_>>();
        if stages.is_empty() {
            return;
        }

        for stage in stages {
            self.entries.remove(&(path.to_path_buf(), stage));
        }

        for parent in parent_dirs(path) {
            if let Some(children) = self.children.get_mut(parent) {
                children.remove(path);
                if children.is_empty() {
                    self.children.remove(parent);
                }
            }
        }
    }

    /// Replace every entry with the contents of a flattened tree
    pub fn load_tree(&mut self, listing: &TreeListing) -> anyhow::Result<()> {
        self.entries.clear();
        self.children.clear();

        for (path, entry) in listing {
            let entry = IndexEntry::conflicted(path.clone(), entry, Stage::Normal)?;
            self.store_entry(entry);
        }
        self.changed = true;

        Ok(())
    }

    /// Stage-0 entries as a flat tree listing
    pub fn listing(&self) -> TreeListing {
        self.entries
            .values()
            .filter(|entry| !entry.stage.is_conflict())
            .map(|entry| (entry.path.clone(), entry.as_database_entry()))
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Every tracked path once, whatever its stages
    pub fn tracked_paths(&self) -> BTreeSet<PathBuf> {
        self.entries.keys().map(|(path, _)| path.clone()).collect()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        !self.entries_for(path).is_empty()
    }

    /// True for tracked files and for directories containing tracked files
    pub fn is_directly_tracked(&self, path: &Path) -> bool {
        self.is_tracked(path) || self.children.contains_key(path)
    }

    pub fn is_conflicted(&self) -> bool {
        self.entries.keys().any(|(_, stage)| stage.is_conflict())
    }

    pub fn conflicted_paths(&self) -> BTreeSet<PathBuf> {
        self.entries
            .keys()
            .filter(|(_, stage)| stage.is_conflict())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Tracked paths equal to or below `path`; `.` selects everything
    pub fn entries_under_path(&self, path: &Path) -> Vec<PathBuf> {
        self.tracked_paths()
            .into_iter()
            .filter(|entry_path| path == Path::new(".") || entry_path.starts_with(path))
            .collect()
    }
}
