//! Append-only ref history
//!
//! Each ref has a log under `.twig/logs/<ref-path>`, one line per change:
//!
//! ```text
//! <old-oid|-> <new-oid|-> <unix-timestamp> <timezone>\t<operation>
//! ```
//!
//! Lines are only ever appended. A deleted ref keeps its log so the commits it pointed at
//! stay recoverable.

use crate::artifacts::branch::branch_name::SymRefName;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const NULL_OID: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflogEntry {
    pub ref_name: SymRefName,
    pub old_oid: Option<ObjectId>,
    pub new_oid: Option<ObjectId>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl ReflogEntry {
    fn to_line(&self) -> String {
        let render = |oid: &Option<ObjectId>| {
            oid.as_ref()
                .map(|oid| oid.to_string())
                .unwrap_or_else(|| NULL_OID.to_string())
        };
        // keep one entry per line whatever the operation text holds
        let operation = self.operation.replace('\n', " ");

        format!(
            "{} {} {} {}\t{}\n",
            render(&self.old_oid),
            render(&self.new_oid),
            self.timestamp.timestamp(),
            self.timestamp.format("%z"),
            operation
        )
    }

    fn parse_line(ref_name: &SymRefName, line: &str) -> anyhow::Result<Self> {
        let (header, operation) = line
            .split_once('\t')
            .with_context(|| format!("Malformed reflog line: {line}"))?;
        let fields = header.split(' ').collect::<Vec<_>>();
        let [old, new, seconds, timezone] = fields.as_slice() else {
            anyhow::bail!("Malformed reflog header: {header}");
        };

        let parse_oid = |raw: &str| -> anyhow::Result<Option<ObjectId>> {
            match raw {
                NULL_OID => Ok(None),
                raw => Ok(Some(ObjectId::try_parse(raw.to_string())?)),
            }
        };

        let offset = chrono::DateTime::parse_from_str(
            &format!("1970-01-01 00:00:00 {timezone}"),
            "%Y-%m-%d %H:%M:%S %z",
        )
        .with_context(|| format!("Malformed reflog timezone: {timezone}"))?
        .offset()
        .to_owned();
        let timestamp = chrono::DateTime::from_timestamp(seconds.parse::<i64>()?, 0)
            .with_context(|| format!("Malformed reflog timestamp: {seconds}"))?
            .with_timezone(&offset);

        Ok(ReflogEntry {
            ref_name: ref_name.clone(),
            old_oid: parse_oid(old)?,
            new_oid: parse_oid(new)?,
            operation: operation.to_string(),
            timestamp,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Reflog {
    /// `.twig/logs`
    path: Box<Path>,
}

impl Reflog {
    pub fn new(path: Box<Path>) -> Self {
        Reflog { path }
    }

    fn log_path(&self, ref_name: &SymRefName) -> PathBuf {
        self.path.join(ref_name.as_ref_path())
    }

    pub fn append(&self, entry: &ReflogEntry) -> anyhow::Result<()> {
        let log_path = self.log_path(&entry.ref_name);
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create reflog directory {}", parent.display()))?;
        }

        let mut log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Unable to open reflog {}", log_path.display()))?;
        let mut lock = file_guard::lock(&mut log_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut()
            .write_all(entry.to_line().as_bytes())
            .with_context(|| format!("Unable to append to reflog {}", log_path.display()))?;

        tracing::trace!(ref_name = %entry.ref_name, operation = %entry.operation, "reflog appended");
        Ok(())
    }

    /// Entries oldest first; a ref without history yields an empty log
    pub fn read(&self, ref_name: &SymRefName) -> anyhow::Result<Vec<ReflogEntry>> {
        let log_path = self.log_path(ref_name);
        if !log_path.exists() {
            return Ok(Vec::new());
        }

        std::fs::read_to_string(&log_path)
            .with_context(|| format!("Unable to read reflog {}", log_path.display()))?
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| ReflogEntry::parse_line(ref_name, line))
            .collect()
    }

    /// Every ref with a log, including deleted refs
    pub fn ref_names(&self) -> Vec<SymRefName> {
        WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.path).ok()?;
                Some(SymRefName::new(relative.to_str()?.to_string()))
            })
            .collect()
    }

    /// Every object ID mentioned by any log
    pub fn all_oids(&self) -> anyhow::Result<Vec<ObjectId>> {
        let mut oids = Vec::new();
        for ref_name in self.ref_names() {
            for entry in self.read(&ref_name)? {
                oids.extend(entry.old_oid);
                oids.extend(entry.new_oid);
            }
        }

        Ok(oids)
    }
}
