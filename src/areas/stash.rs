//! Stash stack
//!
//! `.twig/STASH_STACK` lists stash commits, newest first, one ID per line. `refs/stash`
//! mirrors the top entry so every push and drop also lands in the reflog.

use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const STASH_STACK_FILE: &str = "STASH_STACK";

#[derive(Debug, Clone)]
pub struct StashStack {
    path: PathBuf,
}

impl StashStack {
    pub fn new(git_dir: &Path) -> Self {
        StashStack {
            path: git_dir.join(STASH_STACK_FILE),
        }
    }

    /// Entries, `stash@{0}` first
    pub fn entries(&self) -> anyhow::Result<Vec<ObjectId>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Unable to read stash stack {}", self.path.display()))?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| ObjectId::try_parse(line.trim().to_string()))
            .collect()
    }

    pub fn get(&self, position: usize) -> anyhow::Result<ObjectId> {
        self.entries()?
            .get(position)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("stash entry", format!("stash@{{{position}}}")))
    }

    pub fn push(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let mut entries = self.entries()?;
        entries.insert(0, oid.clone());
        self.write(&entries)
    }

    /// Remove an entry, returning it
    pub fn remove(&self, position: usize) -> anyhow::Result<ObjectId> {
        let mut entries = self.entries()?;
        if position >= entries.len() {
            return Err(RepositoryError::not_found(
                "stash entry",
                format!("stash@{{{position}}}"),
            ));
        }

        let removed = entries.remove(position);
        self.write(&entries)?;
        Ok(removed)
    }

    fn write(&self, entries: &[ObjectId]) -> anyhow::Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).with_context(|| {
                    format!("Unable to remove stash stack {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        let content = entries
            .iter()
            .map(|oid| format!("{oid}\n"))
            .collect::<String>();
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, content)
            .with_context(|| format!("Unable to write {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Unable to move stash stack into {}", self.path.display()))
    }
}
