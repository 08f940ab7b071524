//! Repository-wide advisory lock
//!
//! Ref-mutating operations hold `.twig/twig.lock` for their duration. The file is created
//! with create-new semantics and records `<pid> <unix-timestamp>`. A lock older than the
//! configured staleness window is assumed to belong to a crashed process and is taken over.

use crate::errors::RepositoryError;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = "twig.lock";

/// Held lock; the lock file is removed when this is dropped
#[derive(Debug)]
pub struct RepositoryLock {
    path: PathBuf,
}

impl RepositoryLock {
    pub fn acquire(git_dir: &Path, stale_after_secs: u64) -> anyhow::Result<Self> {
        let path = git_dir.join(LOCK_FILE);

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path).unwrap_or_default();
                let holder = holder.trim().to_string();

                if !Self::is_stale(&holder, stale_after_secs) {
                    return Err(RepositoryError::LockHeld { path, holder }.into());
                }

                tracing::warn!(lock = %path.display(), %holder, "taking over stale repository lock");
                std::fs::remove_file(&path)
                    .with_context(|| format!("Unable to remove stale lock {}", path.display()))?;

                Self::create(&path).map_err(|error| match error.kind() {
                    std::io::ErrorKind::AlreadyExists => RepositoryError::LockHeld {
                        path: path.clone(),
                        holder: "a concurrent process".to_string(),
                    }
                    .into(),
                    _ => anyhow::Error::from(error)
                        .context(format!("Unable to create lock {}", path.display())),
                })
            }
            Err(error) => Err(anyhow::Error::from(error)
                .context(format!("Unable to create lock {}", path.display()))),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;

        let stamp = format!(
            "{} {}",
            std::process::id(),
            chrono::Utc::now().timestamp()
        );
        if let Err(error) = file.write_all(stamp.as_bytes()) {
            let _ = std::fs::remove_file(path);
            return Err(error);
        }

        tracing::trace!(lock = %path.display(), "repository lock acquired");
        Ok(RepositoryLock {
            path: path.to_path_buf(),
        })
    }

    /// A lock with an unreadable stamp is treated as stale
    fn is_stale(holder: &str, stale_after_secs: u64) -> bool {
        let taken_at = holder
            .split_whitespace()
            .nth(1)
            .and_then(|timestamp| timestamp.parse::<i64>().ok());

        match taken_at {
            Some(taken_at) => {
                let age = chrono::Utc::now().timestamp().saturating_sub(taken_at).max(0);
                age as u64 > stale_after_secs
            }
            None => true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepositoryLock {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), %error, "failed to release repository lock");
        } else {
            tracing::trace!(lock = %self.path.display(), "repository lock released");
        }
    }
}
