//! References (branches, tags, HEAD)
//!
//! Refs are text files under `.twig` holding either a hex object ID or, for HEAD only,
//! `ref: <path>` when a branch is checked out.
//!
//! ## Updates
//!
//! Every write is a compare-and-swap: the ref file is locked with `file-guard`, its current
//! value compared with the caller's expectation, and the new value written to a temp file
//! that is renamed over the ref. A mismatch fails with `RefConflict` and leaves the ref
//! untouched. Successful writes append to the ref's reflog.

use crate::areas::reflog::{Reflog, ReflogEntry};
use crate::artifacts::branch::branch_name::{
    HEAD_REF_NAME, HEADS_PREFIX, ORIG_HEAD_REF_NAME, RefKind, RefName, SymRefName, TAGS_PREFIX,
};
use crate::artifacts::core::clock::Clock;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::Context;
use file_guard::Lock;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Raw content of a ref file
#[derive(Debug, Clone, PartialEq, Eq)]
enum SymRefOrOid {
    SymRef { sym_ref_name: SymRefName },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read ref file {}", path.display()))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].to_string()),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }

    fn render(&self) -> String {
        match self {
            SymRefOrOid::SymRef { sym_ref_name } => format!("ref: {sym_ref_name}\n"),
            SymRefOrOid::Oid(oid) => format!("{oid}\n"),
        }
    }
}

/// What HEAD points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// A branch is checked out; it may not have any commit yet
    Attached(SymRefName),
    Detached(ObjectId),
}

impl Head {
    pub fn branch(&self) -> Option<&SymRefName> {
        match self {
            Head::Attached(branch) => Some(branch),
            Head::Detached(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Refs {
    /// Path to `.twig`
    path: Box<Path>,
    reflog: Reflog,
    clock: Arc<dyn Clock>,
}

impl Refs {
    pub fn new(path: Box<Path>, clock: Arc<dyn Clock>) -> Self {
        let reflog = Reflog::new(path.join("logs").into_boxed_path());
        Refs {
            path,
            reflog,
            clock,
        }
    }

    pub fn reflog(&self) -> &Reflog {
        &self.reflog
    }

    pub fn head(&self) -> anyhow::Result<Head> {
        match SymRefOrOid::read_symref_or_oid(&self.head_path())? {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => Ok(Head::Attached(sym_ref_name)),
            Some(SymRefOrOid::Oid(oid)) => Ok(Head::Detached(oid)),
            None => Err(RepositoryError::not_found("ref", HEAD_REF_NAME)),
        }
    }

    /// Commit HEAD resolves to, `None` on an unborn branch
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        match self.head()? {
            Head::Attached(branch) => self.read_ref(&branch),
            Head::Detached(oid) => Ok(Some(oid)),
        }
    }

    pub fn current_branch(&self) -> anyhow::Result<Option<SymRefName>> {
        Ok(self.head()?.branch().cloned())
    }

    pub fn is_current_branch(&self, branch: &SymRefName) -> anyhow::Result<bool> {
        Ok(self.current_branch()?.as_ref() == Some(branch))
    }

    /// Point HEAD at a branch or detach it at a commit
    pub fn set_head(&self, target: &Head, operation: &str) -> anyhow::Result<()> {
        let old_oid = self.read_head().ok().flatten();
        let content = match target {
            Head::Attached(branch) => SymRefOrOid::SymRef {
                sym_ref_name: branch.clone(),
            },
            Head::Detached(oid) => SymRefOrOid::Oid(oid.clone()),
        };

        self.with_locked_ref(&self.head_path(), |path| {
            write_ref_file(path, &content.render())
        })?;

        let new_oid = self.read_head()?;
        tracing::debug!(head = ?target, "HEAD moved");
        self.append_log(&SymRefName::head(), old_oid, new_oid, operation)
    }

    /// Move whatever HEAD points at (the checked-out branch or the detached HEAD itself)
    pub fn update_head(
        &self,
        new_oid: &ObjectId,
        expected: Option<&ObjectId>,
        operation: &str,
    ) -> anyhow::Result<()> {
        match self.head()? {
            Head::Attached(branch) => {
                self.update_ref(&branch, new_oid, expected, operation)?;
                self.append_log(
                    &SymRefName::head(),
                    expected.cloned(),
                    Some(new_oid.clone()),
                    operation,
                )
            }
            Head::Detached(_) => {
                let head = SymRefName::head();
                self.compare_and_swap(&head, Some(new_oid), expected)?;
                self.append_log(&head, expected.cloned(), Some(new_oid.clone()), operation)
            }
        }
    }

    /// Atomically replace `name`'s value if it still equals `expected` (`None` = absent)
    pub fn update_ref(
        &self,
        name: &SymRefName,
        new_oid: &ObjectId,
        expected: Option<&ObjectId>,
        operation: &str,
    ) -> anyhow::Result<()> {
        self.compare_and_swap(name, Some(new_oid), expected)?;
        tracing::debug!(ref_name = %name, new = %new_oid, "ref updated");
        self.append_log(name, expected.cloned(), Some(new_oid.clone()), operation)
    }

    pub fn create_ref(
        &self,
        name: &RefName,
        kind: RefKind,
        oid: &ObjectId,
        operation: &str,
    ) -> anyhow::Result<SymRefName> {
        let sym_ref_name = name.qualify(kind);
        if self.read_ref(&sym_ref_name)?.is_some() {
            return Err(RepositoryError::RefExists {
                name: sym_ref_name.to_string(),
            }
            .into());
        }

        self.update_ref(&sym_ref_name, oid, None, operation)?;
        Ok(sym_ref_name)
    }

    /// Remove a ref; its reflog stays behind with a closing entry
    pub fn delete_ref(&self, name: &SymRefName, operation: &str) -> anyhow::Result<ObjectId> {
        let path = self.path.join(name.as_ref_path()).into_boxed_path();

        let old_oid = self.with_locked_ref(&path, |path| {
            match SymRefOrOid::read_symref_or_oid(path)? {
                Some(SymRefOrOid::Oid(oid)) => {
                    std::fs::remove_file(path)
                        .with_context(|| format!("Unable to delete ref {}", path.display()))?;
                    Ok(oid)
                }
                Some(SymRefOrOid::SymRef { .. }) => Err(RepositoryError::invalid_state(
                    format!("cannot delete symbolic ref {name}"),
                )),
                None => {
                    remove_if_empty(path);
                    Err(RepositoryError::not_found("ref", name))
                }
            }
        })?;
        self.prune_empty_parent_dirs(&path)?;

        tracing::debug!(ref_name = %name, old = %old_oid, "ref deleted");
        self.append_log(name, Some(old_oid.clone()), None, operation)?;
        Ok(old_oid)
    }

    /// Value of a ref, following a symbolic HEAD
    pub fn read_ref(&self, name: &SymRefName) -> anyhow::Result<Option<ObjectId>> {
        self.read_symref(&self.path.join(name.as_ref_path()))
    }

    fn read_symref(&self, path: &Path) -> anyhow::Result<Option<ObjectId>> {
        match SymRefOrOid::read_symref_or_oid(path)? {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                self.read_symref(&self.path.join(sym_ref_name.as_ref_path()))
            }
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => Ok(None),
        }
    }

    /// Find an existing ref by short or full name: `name`, `refs/name`, `refs/heads/name`,
    /// `refs/tags/name`, in that order
    pub fn find_ref(&self, name: &str) -> Option<SymRefName> {
        [
            name.to_string(),
            format!("refs/{name}"),
            format!("{HEADS_PREFIX}{name}"),
            format!("{TAGS_PREFIX}{name}"),
        ]
        .into_iter()
        .find(|candidate| {
            let path = self.path.join(candidate);
            path.is_file()
                && matches!(SymRefOrOid::read_symref_or_oid(&path), Ok(Some(_)))
        })
        .map(SymRefName::new)
    }

    pub fn set_orig_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let path = self.path.join(ORIG_HEAD_REF_NAME).into_boxed_path();
        let content = SymRefOrOid::Oid(oid.clone()).render();
        self.with_locked_ref(&path, |path| write_ref_file(path, &content))
    }

    pub fn orig_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_ref(&SymRefName::new(ORIG_HEAD_REF_NAME.to_string()))
    }

    pub fn list_branches(&self) -> anyhow::Result<Vec<SymRefName>> {
        self.list_refs(&self.path.join(HEADS_PREFIX))
    }

    pub fn list_tags(&self) -> anyhow::Result<Vec<SymRefName>> {
        self.list_refs(&self.path.join(TAGS_PREFIX))
    }

    /// Every ref under `refs/` plus HEAD and ORIG_HEAD
    pub fn list_all_refs(&self) -> anyhow::Result<Vec<SymRefName>> {
        Ok(self
            .list_refs(&self.path.join("refs"))?
            .into_iter()
            .chain([
                SymRefName::head(),
                SymRefName::new(ORIG_HEAD_REF_NAME.to_string()),
            ])
            .collect())
    }

    fn list_refs(&self, path: &Path) -> anyhow::Result<Vec<SymRefName>> {
        let mut refs = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative_path = entry.path().strip_prefix(self.path.as_ref()).ok()?;
                let name = relative_path.to_str()?;
                // in-flight temp files and empty placeholders are not refs
                if name.ends_with(".tmp") || entry.metadata().ok()?.len() == 0 {
                    return None;
                }
                Some(SymRefName::new(name.to_string()))
            })
            .collect::<Vec<_>>();
        refs.sort();

        Ok(refs)
    }

    /// Commit -> refs pointing at it, used to decorate log output
    pub fn reverse_refs(&self) -> anyhow::Result<HashMap<ObjectId, Vec<SymRefName>>> {
        let mut reverse = HashMap::new();
        for sym_ref in self.list_all_refs()? {
            if sym_ref.as_ref_path() == ORIG_HEAD_REF_NAME {
                continue;
            }
            if let Some(oid) = self.read_ref(&sym_ref)? {
                reverse.entry(oid).or_insert_with(Vec::new).push(sym_ref);
            }
        }

        Ok(reverse)
    }

    fn compare_and_swap(
        &self,
        name: &SymRefName,
        new_oid: Option<&ObjectId>,
        expected: Option<&ObjectId>,
    ) -> anyhow::Result<()> {
        let path = self.path.join(name.as_ref_path()).into_boxed_path();

        self.with_locked_ref(&path, |path| {
            let current = match SymRefOrOid::read_symref_or_oid(path)? {
                Some(SymRefOrOid::Oid(oid)) => Some(oid),
                Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                    return Err(RepositoryError::RefConflict {
                        name: name.to_string(),
                        expected: RepositoryError::describe_oid(expected),
                        actual: format!("ref: {sym_ref_name}"),
                    }
                    .into());
                }
                None => None,
            };

            if current.as_ref() != expected {
                remove_if_empty(path);
                return Err(RepositoryError::RefConflict {
                    name: name.to_string(),
                    expected: RepositoryError::describe_oid(expected),
                    actual: RepositoryError::describe_oid(current.as_ref()),
                }
                .into());
            }

            match new_oid {
                Some(oid) => write_ref_file(path, &SymRefOrOid::Oid(oid.clone()).render()),
                None => std::fs::remove_file(path)
                    .with_context(|| format!("Unable to delete ref {}", path.display())),
            }
        })
    }

    /// Run `f` while holding an exclusive lock on the ref file at `path`
    ///
    /// The file is created (empty) if missing. Writers replace the file by renaming, so
    /// after acquiring the lock we check that the locked file is still the one at `path`
    /// and start over otherwise.
    fn with_locked_ref<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&Path) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create ref directory {}", parent.display()))?;
        }

        loop {
            let mut ref_file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .with_context(|| format!("Unable to open ref file {}", path.display()))?;
            let lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;

            if !is_same_file(&lock, path) {
                tracing::trace!(path = %path.display(), "ref replaced while waiting for lock");
                continue;
            }

            return f(path);
        }
    }

    fn append_log(
        &self,
        name: &SymRefName,
        old_oid: Option<ObjectId>,
        new_oid: Option<ObjectId>,
        operation: &str,
    ) -> anyhow::Result<()> {
        self.reflog.append(&ReflogEntry {
            ref_name: name.clone(),
            old_oid,
            new_oid,
            operation: operation.to_string(),
            timestamp: self.clock.now(),
        })
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> anyhow::Result<()> {
        let refs_path = self.path.join("refs");
        if let Some(parent) = path.parent()
            && parent.starts_with(&refs_path)
            && parent != refs_path
            && parent != self.path.join(HEADS_PREFIX.trim_end_matches('/'))
            && parent != self.path.join(TAGS_PREFIX.trim_end_matches('/'))
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent).with_context(|| {
                format!("Unable to remove empty ref directory {}", parent.display())
            })?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }
}

fn write_ref_file(path: &Path, content: &str) -> anyhow::Result<()> {
    let temp_path = path.with_file_name(format!(
        "{}.{}.tmp",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("ref"),
        fake::rand::random::<u32>()
    ));

    let mut temp_file = File::create(&temp_path)
        .with_context(|| format!("Unable to create {}", temp_path.display()))?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.sync_all()?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Unable to move ref into place at {}", path.display()))
}

/// A failed creation must not leave an empty placeholder behind
fn remove_if_empty(path: &Path) {
    if std::fs::metadata(path).is_ok_and(|metadata| metadata.len() == 0) {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(unix)]
fn is_same_file(locked: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (locked.metadata(), std::fs::metadata(path)) {
        (Ok(locked), Ok(current)) => locked.ino() == current.ino() && locked.dev() == current.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(_locked: &File, path: &Path) -> bool {
    path.exists()
}
