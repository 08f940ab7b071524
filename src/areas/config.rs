//! Repository configuration
//!
//! Stored as `.twig/config.toml`:
//!
//! ```toml
//! [core]
//! hash = "sha1"            # or "sha256"
//! default_branch = "main"
//!
//! [user]
//! name = "Ada Lovelace"
//! email = "ada@example.com"
//!
//! [merge]
//! fast_forward = "allow"   # "never" | "only"
//! conflict_style = "merge" # "diff3"
//!
//! [lock]
//! stale_after_secs = 600
//! ```

use crate::artifacts::core::clock::Clock;
use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::hasher::HashAlgorithm;
use crate::errors::RepositoryError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "config.toml";

const AUTHOR_NAME_ENV: &str = "GIT_AUTHOR_NAME";
const AUTHOR_EMAIL_ENV: &str = "GIT_AUTHOR_EMAIL";
const AUTHOR_DATE_ENV: &str = "GIT_AUTHOR_DATE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub core: CoreConfig,
    pub user: UserConfig,
    pub merge: MergeConfig,
    pub lock: LockConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub hash: HashAlgorithm,
    pub default_branch: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            hash: HashAlgorithm::default(),
            default_branch: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FastForward {
    #[default]
    Allow,
    Never,
    Only,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStyle {
    #[default]
    Merge,
    Diff3,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub fast_forward: FastForward,
    pub conflict_style: ConflictStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub stale_after_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            stale_after_secs: 600,
        }
    }
}

impl Config {
    /// Read the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Malformed config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Unable to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Unable to write config file {}", path.display()))
    }

    /// Resolve the identity recorded on new commits
    ///
    /// `GIT_AUTHOR_NAME`/`GIT_AUTHOR_EMAIL` win over `[user]`. `GIT_AUTHOR_DATE` pins the
    /// timestamp, otherwise the clock supplies it.
    pub fn author(&self, clock: &dyn Clock) -> anyhow::Result<Author> {
        let name = std::env::var(AUTHOR_NAME_ENV).ok().or_else(|| self.user.name.clone());
        let email = std::env::var(AUTHOR_EMAIL_ENV).ok().or_else(|| self.user.email.clone());

        let (Some(name), Some(email)) = (name, email) else {
            return Err(RepositoryError::invalid_state(format!(
                "author identity unknown: set {AUTHOR_NAME_ENV}/{AUTHOR_EMAIL_ENV} or [user] in {CONFIG_FILE}"
            )));
        };

        let timestamp = std::env::var(AUTHOR_DATE_ENV)
            .ok()
            .and_then(|date| parse_author_date(&date))
            .unwrap_or_else(|| clock.now());

        Ok(Author::new(name, email, timestamp))
    }
}

fn parse_author_date(date: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    chrono::DateTime::parse_from_rfc2822(date)
        .or_else(|_| chrono::DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
}
