use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use twig::commands::porcelain::reset::ResetMode;

async fn index_bytes(sandbox: &Sandbox) -> Vec<u8> {
    let index = sandbox.repository.index();
    let index = index.lock().await;
    std::fs::read(index.path()).unwrap()
}

#[rstest]
#[tokio::test]
async fn hard_reset_there_and_back_restores_files_and_index(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox
        .commit_files(&[("keep.txt", "v1\n"), ("old.txt", "old\n")], "first")
        .await;
    sandbox.delete("old.txt");
    sandbox
        .commit_files(&[("keep.txt", "v2\n"), ("dir/new.txt", "new\n")], "second")
        .await;
    let prior_head = sandbox.head();
    let files = sandbox.files();
    let index = index_bytes(&sandbox).await;

    repository.reset(ResetMode::Hard, "HEAD~1").await.unwrap();
    assert_eq!(sandbox.read("keep.txt"), "v1\n");
    assert_eq!(sandbox.read("old.txt"), "old\n");
    assert!(!sandbox.exists("dir/new.txt"));

    repository
        .reset(ResetMode::Hard, &prior_head.to_string())
        .await
        .unwrap();

    assert_eq!(sandbox.head(), prior_head);
    assert_eq!(sandbox.files(), files);
    assert_eq!(index_bytes(&sandbox).await, index);
}

#[rstest]
#[tokio::test]
async fn hard_reset_discards_tracked_edits_but_not_untracked_files(sandbox: Sandbox) {
    sandbox.commit_files(&[("a.txt", "committed\n")], "first").await;
    sandbox.write("a.txt", "edited\n");
    sandbox.write("scratch.txt", "untracked\n");

    sandbox.repository.reset(ResetMode::Hard, "HEAD").await.unwrap();

    assert_eq!(sandbox.read("a.txt"), "committed\n");
    assert_eq!(sandbox.read("scratch.txt"), "untracked\n");
}
