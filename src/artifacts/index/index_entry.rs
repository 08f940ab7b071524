//! Index entries
//!
//! An entry stages one blob at one path. Stage 0 is the normal slot; stages 1 to 3 hold
//! the base, ours and theirs versions of a path with an unresolved merge conflict.

use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object::Packable;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Conflict slot of an index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Normal = 0,
    Base = 1,
    Ours = 2,
    Theirs = 3,
}

impl Stage {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_conflict(self) -> bool {
        self != Stage::Normal
    }
}

impl TryFrom<u8> for Stage {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> anyhow::Result<Self> {
        match value {
            0 => Ok(Stage::Normal),
            1 => Ok(Stage::Base),
            2 => Ok(Stage::Ours),
            3 => Ok(Stage::Theirs),
            _ => Err(anyhow::anyhow!("Invalid index stage {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexEntry {
    pub path: PathBuf,
    pub oid: ObjectId,
    pub mode: FileMode,
    #[new(default)]
    pub stage: Stage,
}

impl IndexEntry {
    pub fn conflicted(path: PathBuf, entry: &DatabaseEntry, stage: Stage) -> anyhow::Result<Self> {
        Ok(IndexEntry {
            path,
            oid: entry.oid.clone(),
            mode: FileMode::try_from(entry.mode)?,
            stage,
        })
    }

    pub fn entry_mode(&self) -> EntryMode {
        EntryMode::File(self.mode)
    }

    pub fn as_database_entry(&self) -> DatabaseEntry {
        DatabaseEntry::new(self.oid.clone(), self.entry_mode())
    }

    /// Every proper ancestor directory, outermost first
    pub fn parent_dirs(&self) -> Vec<&Path> {
        parent_dirs(&self.path)
    }

    pub fn basename(&self) -> anyhow::Result<&str> {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Invalid entry path {}", self.path.display()))
    }

    pub fn read_from<R: Read>(reader: &mut Checksum<R>) -> anyhow::Result<Self> {
        let mode = byteorder::NetworkEndian::read_u32(&reader.read(4)?);
        let mode = FileMode::try_from(EntryMode::try_from(mode)?)?;
        let stage = Stage::try_from(reader.read(1)?[0])?;

        let oid_len = reader.read(1)?[0] as usize;
        let oid = String::from_utf8(reader.read(oid_len)?.to_vec())
            .context("Invalid UTF-8 in entry object id")?;
        let oid = ObjectId::try_parse(oid)?;

        let path_len = byteorder::NetworkEndian::read_u16(&reader.read(2)?) as usize;
        let path = String::from_utf8(reader.read(path_len)?.to_vec())
            .context("Invalid UTF-8 in entry path")?;

        Ok(IndexEntry {
            path: PathBuf::from(path),
            oid,
            mode,
            stage,
        })
    }
}

pub fn parent_dirs(path: &Path) -> Vec<&Path> {
    let mut dirs = path
        .ancestors()
        .skip(1)
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .collect::<Vec<_>>();
    dirs.reverse();
    dirs
}

impl Packable for IndexEntry {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let path = self
            .path
            .to_str()
            .with_context(|| format!("Invalid entry path {}", self.path.display()))?;
        let path_len = u16::try_from(path.len())
            .with_context(|| format!("Entry path too long: {path}"))?;

        let mut entry_bytes = Vec::new();
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.entry_mode().as_u32())?;
        entry_bytes.write_u8(self.stage.as_u8())?;
        entry_bytes.write_u8(self.oid.as_ref().len() as u8)?;
        entry_bytes.write_all(self.oid.as_ref().as_bytes())?;
        entry_bytes.write_u16::<byteorder::NetworkEndian>(path_len)?;
        entry_bytes.write_all(path.as_bytes())?;

        Ok(Bytes::from(entry_bytes))
    }
}
