use crate::common::{AUTHOR_EMAIL, AUTHOR_NAME};
use assert_fs::TempDir;
use rstest::fixture;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use twig::areas::config::Config;
use twig::areas::repository::Repository;
use twig::areas::workspace::MemoryWorkspace;
use twig::artifacts::core::clock::SteppedClock;
use twig::artifacts::index::entry_mode::FileMode;
use twig::artifacts::index::index_entry::Stage;
use twig::artifacts::objects::object_id::ObjectId;

/// Repository metadata on disk, working tree in memory, time ticking one second per read
pub struct Sandbox {
    pub dir: TempDir,
    pub repository: Repository,
}

#[fixture]
pub fn sandbox() -> Sandbox {
    Sandbox::new(Config::default())
}

impl Sandbox {
    pub fn new(mut config: Config) -> Self {
        config.user.name = Some(AUTHOR_NAME.to_string());
        config.user.email = Some(AUTHOR_EMAIL.to_string());

        let dir = TempDir::new().expect("Failed to create temp dir");
        let repository = Repository::init(dir.path(), Box::new(MemoryWorkspace::new()), config)
            .expect("Failed to init repository")
            .with_clock(Arc::new(SteppedClock::default()));

        Sandbox { dir, repository }
    }

    pub fn write(&self, path: &str, content: &str) {
        self.repository
            .workspace()
            .write_file(Path::new(path), content.as_bytes(), FileMode::Regular)
            .expect("Failed to write file");
    }

    pub fn delete(&self, path: &str) {
        self.repository
            .workspace()
            .remove_file(Path::new(path))
            .expect("Failed to remove file");
    }

    pub fn read(&self, path: &str) -> String {
        let content = self
            .repository
            .workspace()
            .read_file(Path::new(path))
            .expect("Failed to read file");
        String::from_utf8_lossy(&content).into_owned()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.repository.workspace().is_file(Path::new(path))
    }

    /// Every working file with its content
    pub fn files(&self) -> BTreeMap<String, String> {
        self.repository
            .workspace()
            .list_files()
            .expect("Failed to list files")
            .into_iter()
            .map(|path| {
                let path = path.display().to_string();
                let content = self.read(&path);
                (path, content)
            })
            .collect()
    }

    pub async fn add_all(&self) {
        self.repository
            .add(&[PathBuf::from(".")])
            .await
            .expect("Failed to stage files");
    }

    /// Write `files`, stage everything and commit
    pub async fn commit_files(&self, files: &[(&str, &str)], message: &str) -> ObjectId {
        for (path, content) in files {
            self.write(path, content);
        }
        self.add_all().await;

        self.repository
            .commit(message)
            .await
            .expect("Failed to commit")
    }

    pub fn head(&self) -> ObjectId {
        self.repository
            .refs()
            .read_head()
            .expect("Failed to read HEAD")
            .expect("HEAD is unborn")
    }

    pub fn rev(&self, revision: &str) -> ObjectId {
        self.repository
            .resolve(revision)
            .expect("Failed to resolve revision")
    }

    pub fn tree_oid(&self, revision: &str) -> ObjectId {
        let commit = self
            .repository
            .database()
            .load_commit(&self.rev(revision))
            .expect("Failed to load commit");
        commit.tree_oid().clone()
    }

    /// Files of a commit with their content
    pub fn tree_of(&self, revision: &str) -> BTreeMap<String, String> {
        let database = self.repository.database();
        database
            .tree_listing(Some(&self.rev(revision)))
            .expect("Failed to list tree")
            .into_iter()
            .map(|(path, entry)| {
                let blob = database.load_blob(&entry.oid).expect("Failed to load blob");
                (
                    path.display().to_string(),
                    String::from_utf8_lossy(blob.content()).into_owned(),
                )
            })
            .collect()
    }

    /// Index stages recorded for `path`
    pub async fn stages(&self, path: &str) -> Vec<Stage> {
        let index = self.repository.index();
        let mut index = index.lock().await;
        index.rehydrate().expect("Failed to load index");

        index
            .entries_for(Path::new(path))
            .into_iter()
            .map(|entry| entry.stage)
            .collect()
    }

    pub fn subjects(&self, revision: &str) -> Vec<String> {
        self.repository
            .log(Some(revision), false)
            .expect("Failed to walk history")
            .into_iter()
            .map(|(_, commit)| commit.short_message())
            .collect()
    }
}
