use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use twig::errors::{RepositoryError, classify};

async fn two_entries(sandbox: &Sandbox) {
    sandbox.commit_files(&[("file.txt", "base\n")], "initial").await;

    sandbox.write("file.txt", "first\n");
    sandbox.repository.stash_push(Some("first")).await.unwrap();
    sandbox.write("file.txt", "second\n");
    sandbox.repository.stash_push(None).await.unwrap();
}

#[rstest]
#[tokio::test]
async fn newest_entry_is_listed_first(sandbox: Sandbox) {
    two_entries(&sandbox).await;

    let subjects = sandbox
        .repository
        .stash_list()
        .unwrap()
        .into_iter()
        .map(|(_, commit)| commit.short_message())
        .collect::<Vec<_>>();

    assert_eq!(subjects.len(), 2);
    assert!(subjects[0].starts_with("WIP on main: "), "{subjects:?}");
    assert!(subjects[0].ends_with(" initial"));
    assert_eq!(subjects[1], "On main: first");
}

#[rstest]
#[tokio::test]
async fn apply_by_position_keeps_the_stack(sandbox: Sandbox) {
    two_entries(&sandbox).await;

    sandbox.repository.stash_apply(1).await.unwrap();

    assert_eq!(sandbox.read("file.txt"), "first\n");
    assert_eq!(sandbox.repository.stash_list().unwrap().len(), 2);
}

#[rstest]
#[tokio::test]
async fn drop_removes_one_entry_and_moves_the_ref(sandbox: Sandbox) {
    two_entries(&sandbox).await;
    let repository = &sandbox.repository;
    let entries = repository.stash_list().unwrap();

    let dropped = repository.stash_drop(0).unwrap();

    assert_eq!(dropped, entries[0].0);
    assert_eq!(repository.stash_list().unwrap().len(), 1);
    assert_eq!(sandbox.rev("refs/stash"), entries[1].0);

    repository.stash_drop(0).unwrap();
    assert!(repository.stash_list().unwrap().is_empty());
    assert!(repository.resolve("refs/stash").is_err());
}

#[rstest]
#[tokio::test]
async fn missing_position_is_not_found(sandbox: Sandbox) {
    two_entries(&sandbox).await;

    let err = sandbox.repository.stash_drop(5).unwrap_err();

    assert!(matches!(classify(&err), Some(RepositoryError::NotFound { .. })));
}
