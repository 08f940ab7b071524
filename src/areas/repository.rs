use crate::areas::config::{CONFIG_FILE, Config};
use crate::areas::database::Database;
use crate::areas::hooks::{Hook, HookPoint, Hooks};
use crate::areas::index::Index;
use crate::areas::lock::RepositoryLock;
use crate::areas::refs::Refs;
use crate::areas::stash::StashStack;
use crate::areas::workspace::{METADATA_DIR, Workspace};
use crate::artifacts::branch::branch_name::{HEADS_PREFIX, RefName, TAGS_PREFIX};
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::core::clock::{Clock, SystemClock};
use crate::artifacts::database::TreeListing;
use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Repository {
    /// Directory holding `.twig`
    path: Box<Path>,
    git_dir: Box<Path>,
    config: Config,
    clock: Arc<dyn Clock>,
    index: Arc<Mutex<Index>>,
    database: Database,
    workspace: Box<dyn Workspace>,
    refs: Refs,
    hooks: Hooks,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("workspace", &self.workspace)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Create `.twig` under `path`, or reopen it if it already exists
    pub fn init(path: &Path, workspace: Box<dyn Workspace>, config: Config) -> anyhow::Result<Self> {
        let git_dir = path.join(METADATA_DIR);

        for dir in [
            git_dir.join("objects"),
            git_dir.join(HEADS_PREFIX),
            git_dir.join(TAGS_PREFIX),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let config_path = git_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            config.save(&config_path)?;
        }

        let head_path = git_dir.join("HEAD");
        if !head_path.exists() {
            let default_branch = RefName::try_parse(config.core.default_branch.clone())?;
            std::fs::write(&head_path, format!("ref: {HEADS_PREFIX}{default_branch}\n"))
                .context("Failed to create initial HEAD reference")?;
        }

        tracing::info!(path = %path.display(), "repository initialized");
        Self::open(path, workspace)
    }

    pub fn open(path: &Path, workspace: Box<dyn Workspace>) -> anyhow::Result<Self> {
        let git_dir = path.join(METADATA_DIR);
        if !git_dir.is_dir() {
            return Err(RepositoryError::not_found("repository", path.display()));
        }

        let config = Config::load(&git_dir.join(CONFIG_FILE))?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        Ok(Repository {
            path: path.into(),
            index: Arc::new(Mutex::new(Index::new(
                git_dir.join("index").into_boxed_path(),
            ))),
            database: Database::new(
                git_dir.join("objects").into_boxed_path(),
                config.core.hash.hasher(),
            ),
            refs: Refs::new(git_dir.clone().into_boxed_path(), clock.clone()),
            git_dir: git_dir.into_boxed_path(),
            config,
            clock,
            workspace,
            hooks: Hooks::default(),
        })
    }

    /// Swap the time source used for commits and reflog entries
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.refs = Refs::new(self.git_dir.clone(), clock.clone());
        self.clock = clock;
        self
    }

    pub fn register_hook(&mut self, point: HookPoint, hook: Hook) {
        self.hooks.register(point, hook);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn index(&self) -> Arc<Mutex<Index>> {
        self.index.clone()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &dyn Workspace {
        self.workspace.as_ref()
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn stash_stack(&self) -> StashStack {
        StashStack::new(&self.git_dir)
    }

    /// Exclusive lock for ref-mutating operations, released on drop
    pub fn lock(&self) -> anyhow::Result<RepositoryLock> {
        RepositoryLock::acquire(&self.git_dir, self.config.lock.stale_after_secs)
    }

    pub fn author(&self) -> anyhow::Result<Author> {
        self.config.author(self.clock.as_ref())
    }

    /// Resolve a revision expression to a commit ID
    pub fn resolve(&self, revision: &str) -> anyhow::Result<ObjectId> {
        Revision::try_parse(revision)?.resolve(self)
    }

    /// Files of the HEAD commit, empty on an unborn branch
    pub fn head_listing(&self) -> anyhow::Result<TreeListing> {
        let head = self.refs.read_head()?;
        self.database.tree_listing(head.as_ref())
    }
}
