//! Working-directory adapters
//!
//! The engine never touches the working tree directly; it goes through [`Workspace`].
//! [`DiskWorkspace`] maps it onto a directory (skipping `.twig`), [`MemoryWorkspace`] keeps
//! everything in a map for tests and embedding.
//!
//! Both adapters treat the tree as a set of files: writing `a/b` removes a file named `a`,
//! writing `a` removes everything below a directory named `a`, and removing the last file
//! of a directory removes the directory.

use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::objects::blob::Blob;
use crate::errors::RepositoryError;
use anyhow::Context;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub const METADATA_DIR: &str = ".twig";

/// Content and mode of every file in a working tree
pub type Snapshot = BTreeMap<PathBuf, (Bytes, FileMode)>;

pub trait Workspace: std::fmt::Debug + Send + Sync {
    /// Content of a file; `NotFound` if it does not exist
    fn read_file(&self, path: &Path) -> anyhow::Result<Bytes>;

    fn write_file(&self, path: &Path, content: &[u8], mode: FileMode) -> anyhow::Result<()>;

    /// Every file, relative to the root, sorted
    fn list_files(&self) -> anyhow::Result<Vec<PathBuf>>;

    /// Remove a file; missing files are ignored
    fn remove_file(&self, path: &Path) -> anyhow::Result<()>;

    fn file_mode(&self, path: &Path) -> anyhow::Result<FileMode>;

    fn is_file(&self, path: &Path) -> bool;

    fn parse_blob(&self, path: &Path) -> anyhow::Result<Blob> {
        Ok(Blob::new(self.read_file(path)?))
    }

    /// Files equal to or below `path`; `.` selects everything
    fn list_files_under(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|file| path == Path::new(".") || file.starts_with(path))
            .collect())
    }

    fn snapshot(&self) -> anyhow::Result<Snapshot> {
        self.list_files()?
            .into_iter()
            .map(|path| {
                let content = self.read_file(&path)?;
                let mode = self.file_mode(&path)?;
                Ok((path, (content, mode)))
            })
            .collect()
    }
}

fn validate_relative(path: &Path) -> anyhow::Result<()> {
    let valid = path.components().count() > 0
        && path.components().all(|component| {
            matches!(component, Component::Normal(name) if name != METADATA_DIR)
        });
    if !valid {
        anyhow::bail!("invalid workspace path {}", path.display());
    }

    Ok(())
}

#[derive(Debug)]
pub struct DiskWorkspace {
    path: Box<Path>,
}

impl DiskWorkspace {
    pub fn new(path: Box<Path>) -> Self {
        DiskWorkspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> anyhow::Result<()> {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }

            let full = self.path.join(dir);
            if !full.is_dir() || full.read_dir()?.next().is_some() {
                break;
            }
            std::fs::remove_dir(&full)
                .with_context(|| format!("Failed to remove empty directory {}", full.display()))?;
            current = dir.parent();
        }

        Ok(())
    }

    fn clear_way_for(&self, path: &Path) -> anyhow::Result<()> {
        // a file where a parent directory must go
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            let full = self.path.join(ancestor);
            if full.is_file() {
                std::fs::remove_file(&full)
                    .with_context(|| format!("Failed to remove file {}", full.display()))?;
            }
        }

        // a directory where the file must go
        let full = self.path.join(path);
        if full.is_dir() {
            std::fs::remove_dir_all(&full)
                .with_context(|| format!("Failed to remove directory {}", full.display()))?;
        }

        Ok(())
    }
}

impl Workspace for DiskWorkspace {
    fn read_file(&self, path: &Path) -> anyhow::Result<Bytes> {
        let full = self.path.join(path);
        if !full.is_file() {
            return Err(RepositoryError::not_found("file", path.display()));
        }

        let content = std::fs::read(&full)
            .with_context(|| format!("Failed to read file {}", full.display()))?;
        Ok(Bytes::from(content))
    }

    fn write_file(&self, path: &Path, content: &[u8], mode: FileMode) -> anyhow::Result<()> {
        validate_relative(path)?;
        self.clear_way_for(path)?;

        let full = self.path.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&full, content)
            .with_context(|| format!("Failed to write file {}", full.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let bits = match mode {
                FileMode::Regular => 0o644,
                FileMode::Executable => 0o755,
            };
            std::fs::set_permissions(&full, std::fs::Permissions::from_mode(bits))
                .with_context(|| format!("Failed to set permissions for {}", full.display()))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(())
    }

    fn list_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let walker = WalkDir::new(&self.path)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != METADATA_DIR);

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to scan {}", self.path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(self.path.as_ref())
                .with_context(|| format!("{} is outside the workspace", entry.path().display()))?;
            files.push(relative.to_path_buf());
        }
        files.sort();

        Ok(files)
    }

    fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        let full = self.path.join(path);
        if full.is_file() {
            std::fs::remove_file(&full)
                .with_context(|| format!("Failed to remove file {}", full.display()))?;
        }

        self.prune_empty_parent_dirs(path)
    }

    fn file_mode(&self, path: &Path) -> anyhow::Result<FileMode> {
        let full = self.path.join(path);
        if !full.is_file() {
            return Err(RepositoryError::not_found("file", path.display()));
        }

        if is_executable::is_executable(&full) {
            Ok(FileMode::Executable)
        } else {
            Ok(FileMode::Regular)
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        self.path.join(path).is_file()
    }
}

/// Working tree held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    files: RwLock<Snapshot>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<P: Into<PathBuf>>(files: impl IntoIterator<Item = (P, &'static str)>) -> Self {
        let snapshot = files
            .into_iter()
            .map(|(path, content)| {
                (
                    path.into(),
                    (Bytes::from_static(content.as_bytes()), FileMode::Regular),
                )
            })
            .collect();

        MemoryWorkspace {
            files: RwLock::new(snapshot),
        }
    }
}

impl Workspace for MemoryWorkspace {
    fn read_file(&self, path: &Path) -> anyhow::Result<Bytes> {
        self.files
            .read()
            .get(path)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| RepositoryError::not_found("file", path.display()))
    }

    fn write_file(&self, path: &Path, content: &[u8], mode: FileMode) -> anyhow::Result<()> {
        validate_relative(path)?;

        let mut files = self.files.write();
        for ancestor in path.ancestors().skip(1) {
            files.remove(ancestor);
        }
        files.retain(|existing, _| !existing.starts_with(path) || existing == path);
        files.insert(path.to_path_buf(), (Bytes::copy_from_slice(content), mode));

        Ok(())
    }

    fn list_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        Ok(self.files.read().keys().cloned().collect())
    }

    fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        self.files.write().remove(path);
        Ok(())
    }

    fn file_mode(&self, path: &Path) -> anyhow::Result<FileMode> {
        self.files
            .read()
            .get(path)
            .map(|(_, mode)| *mode)
            .ok_or_else(|| RepositoryError::not_found("file", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }
}
