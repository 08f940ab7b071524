use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeMap;
use std::path::PathBuf;
use twig::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};

#[rstest]
#[tokio::test]
async fn unborn_repository_reports_untracked_files(sandbox: Sandbox) {
    sandbox.write("readme.txt", "hi\n");

    let status = sandbox.repository.status().await.unwrap();

    assert!(status.is_clean());
    assert_eq!(status.untracked.into_iter().collect::<Vec<_>>(), vec![PathBuf::from("readme.txt")]);
}

#[rstest]
#[tokio::test]
async fn staged_and_unstaged_changes_are_told_apart(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox
        .commit_files(
            &[("kept.txt", "kept\n"), ("edited.txt", "v1\n"), ("gone.txt", "bye\n"), ("staged.txt", "s1\n")],
            "initial",
        )
        .await;

    sandbox.write("staged.txt", "s2\n");
    sandbox.write("fresh.txt", "new\n");
    repository
        .add(&[PathBuf::from("staged.txt"), PathBuf::from("fresh.txt")])
        .await
        .unwrap();
    sandbox.write("edited.txt", "v2\n");
    sandbox.delete("gone.txt");
    sandbox.write("build/out.txt", "artifact\n");

    let status = repository.status().await.unwrap();

    assert_eq!(
        status.staged,
        BTreeMap::from([
            (PathBuf::from("fresh.txt"), IndexChangeType::Added),
            (PathBuf::from("staged.txt"), IndexChangeType::Modified),
        ])
    );
    assert_eq!(
        status.unstaged,
        BTreeMap::from([
            (PathBuf::from("edited.txt"), WorkspaceChangeType::Modified),
            (PathBuf::from("gone.txt"), WorkspaceChangeType::Deleted),
        ])
    );
    assert!(status.untracked.iter().any(|path| path.starts_with("build")));
    assert!(!status.is_clean());
}

#[rstest]
#[tokio::test]
async fn rm_cached_keeps_the_file_but_untracks_it(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n"), ("b.txt", "b\n")], "initial").await;

    repository.rm(&[PathBuf::from("a.txt")], true).await.unwrap();
    repository.rm(&[PathBuf::from("b.txt")], false).await.unwrap();

    assert!(sandbox.exists("a.txt"));
    assert!(!sandbox.exists("b.txt"));
    let status = repository.status().await.unwrap();
    assert_eq!(
        status.staged,
        BTreeMap::from([
            (PathBuf::from("a.txt"), IndexChangeType::Deleted),
            (PathBuf::from("b.txt"), IndexChangeType::Deleted),
        ])
    );
    assert!(status.untracked.contains(&PathBuf::from("a.txt")));
}
