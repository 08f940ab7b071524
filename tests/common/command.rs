use crate::common::{AUTHOR_EMAIL, AUTHOR_NAME};
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

#[fixture]
pub fn repository_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    run_twig_command(dir.path(), &["init"]).assert().success();
    dir
}

/// A repository with one commit holding `1.txt`, `a/2.txt` and `a/b/3.txt`
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    write_file(repository_dir.path(), "1.txt", "one\n");
    write_file(repository_dir.path(), "a/2.txt", "two\n");
    write_file(repository_dir.path(), "a/b/3.txt", "three\n");

    run_twig_command(repository_dir.path(), &["add", "."])
        .assert()
        .success();
    twig_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success();

    repository_dir
}

pub fn run_twig_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("twig").expect("Failed to find twig binary");
    cmd.current_dir(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", AUTHOR_NAME)
        .env("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL)
        .env_remove("GIT_AUTHOR_DATE")
        .env("NO_COLOR", "1")
        .env_remove("TWIG_LOG");
    cmd
}

pub fn twig_commit(dir: &Path, message: &str) -> Command {
    run_twig_command(dir, &["commit", "-m", message])
}

pub fn write_file(dir: &Path, path: &str, content: &str) {
    let path = dir.join(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

pub fn read_file(dir: &Path, path: &str) -> String {
    std::fs::read_to_string(dir.join(path)).expect("Failed to read file")
}

/// Commit subjects printed by `twig log --oneline`, newest first
pub fn head_subjects(dir: &Path) -> Vec<String> {
    let output = run_twig_command(dir, &["log", "--oneline"])
        .output()
        .expect("Failed to run twig log");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| {
            let subject = line.split_once(' ').map_or("", |(_, rest)| rest);
            // drop a leading decoration such as "(HEAD -> main) "
            match subject.strip_prefix('(') {
                Some(decorated) => decorated
                    .split_once(") ")
                    .map_or(decorated, |(_, subject)| subject)
                    .to_string(),
                None => subject.to_string(),
            }
        })
        .collect()
}
