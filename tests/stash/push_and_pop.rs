use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;
use twig::commands::porcelain::stash::StashApplyOutcome;
use twig::errors::{RepositoryError, classify};

async fn tracked(sandbox: &Sandbox) {
    sandbox
        .commit_files(&[("app.txt", "v1\n"), ("lib.txt", "lib\n")], "initial")
        .await;
}

#[rstest]
#[tokio::test]
async fn push_cleans_the_tree_and_pop_brings_changes_back(sandbox: Sandbox) {
    tracked(&sandbox).await;
    let repository = &sandbox.repository;
    let head = sandbox.head();

    sandbox.write("app.txt", "v2\n");
    sandbox.write("added.txt", "new\n");
    repository.add(&[PathBuf::from("added.txt")]).await.unwrap();
    sandbox.write("scratch.txt", "untracked\n");

    repository.stash_push(None).await.unwrap();

    assert_eq!(sandbox.head(), head);
    assert_eq!(sandbox.read("app.txt"), "v1\n");
    assert!(!sandbox.exists("added.txt"));
    assert_eq!(sandbox.read("scratch.txt"), "untracked\n");
    let status = repository.status().await.unwrap();
    assert!(status.staged.is_empty() && status.unstaged.is_empty());

    let outcome = repository.stash_pop(0).await.unwrap();

    assert_eq!(outcome, StashApplyOutcome::Applied);
    assert_eq!(sandbox.read("app.txt"), "v2\n");
    assert_eq!(sandbox.read("added.txt"), "new\n");
    let status = repository.status().await.unwrap();
    assert!(status.staged.contains_key(&PathBuf::from("added.txt")));
    assert!(status.unstaged.contains_key(&PathBuf::from("app.txt")));
    assert!(repository.stash_list().unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn deleted_files_are_stashed_too(sandbox: Sandbox) {
    tracked(&sandbox).await;
    let repository = &sandbox.repository;

    sandbox.delete("lib.txt");
    repository.stash_push(Some("drop lib")).await.unwrap();
    assert_eq!(sandbox.read("lib.txt"), "lib\n");

    repository.stash_pop(0).await.unwrap();

    assert!(!sandbox.exists("lib.txt"));
}

#[rstest]
#[tokio::test]
async fn clean_tree_has_nothing_to_stash(sandbox: Sandbox) {
    tracked(&sandbox).await;
    sandbox.write("scratch.txt", "untracked only\n");

    let err = sandbox.repository.stash_push(None).await.unwrap_err();

    assert!(matches!(classify(&err), Some(RepositoryError::InvalidState(_))));
    assert!(err.to_string().contains("no local changes"));
}

#[rstest]
#[tokio::test]
async fn conflicting_apply_keeps_the_entry(sandbox: Sandbox) {
    tracked(&sandbox).await;
    let repository = &sandbox.repository;

    sandbox.write("app.txt", "stashed\n");
    repository.stash_push(None).await.unwrap();
    sandbox.commit_files(&[("app.txt", "committed\n")], "moved on").await;

    let outcome = repository.stash_pop(0).await.unwrap();

    assert_eq!(outcome, StashApplyOutcome::Conflicted(vec![PathBuf::from("app.txt")]));
    assert_eq!(repository.stash_list().unwrap().len(), 1);
    let content = sandbox.read("app.txt");
    assert!(content.contains("<<<<<<< Updated upstream\ncommitted\n"));
    assert!(content.contains("=======\nstashed\n>>>>>>> Stashed changes\n"));
}
