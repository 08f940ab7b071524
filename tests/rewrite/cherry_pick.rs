use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;
use twig::commands::porcelain::cherry_pick::PickOutcome;
use twig::errors::{RepositoryError, classify};

async fn topic_with_fix(sandbox: &Sandbox) {
    sandbox
        .commit_files(&[("lib.txt", "alpha\nbeta\ngamma\n")], "base")
        .await;
    sandbox.repository.create_branch("topic", None).unwrap();
    sandbox.repository.checkout("topic").await.unwrap();
    sandbox
        .commit_files(
            &[("lib.txt", "alpha\nbeta\nGAMMA\n"), ("fix.txt", "fixed\n")],
            "fix gamma",
        )
        .await;
    sandbox.repository.checkout("main").await.unwrap();
}

#[rstest]
#[tokio::test]
async fn pick_replays_the_change_and_keeps_the_author(sandbox: Sandbox) {
    topic_with_fix(&sandbox).await;
    sandbox
        .commit_files(&[("lib.txt", "ALPHA\nbeta\ngamma\n")], "shout alpha")
        .await;
    let head = sandbox.head();

    let outcome = sandbox.repository.cherry_pick("topic", None).await.unwrap();

    let PickOutcome::Committed(picked) = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    let database = sandbox.repository.database();
    let picked_commit = database.load_commit(&picked).unwrap();
    let original = database.load_commit(&sandbox.rev("topic")).unwrap();

    assert_eq!(picked_commit.parents(), &[head]);
    assert_eq!(picked_commit.message(), original.message());
    assert_eq!(picked_commit.author().display(), original.author().display());
    assert_eq!(sandbox.read("lib.txt"), "ALPHA\nbeta\nGAMMA\n");
    assert_eq!(sandbox.tree_of("HEAD")["fix.txt"], "fixed\n");
}

#[rstest]
#[tokio::test]
async fn picking_an_applied_change_creates_nothing(sandbox: Sandbox) {
    topic_with_fix(&sandbox).await;
    sandbox.repository.cherry_pick("topic", None).await.unwrap();
    let head = sandbox.head();

    let outcome = sandbox.repository.cherry_pick("topic", None).await.unwrap();

    assert_eq!(outcome, PickOutcome::Empty);
    assert_eq!(sandbox.head(), head);
}

#[rstest]
#[tokio::test]
async fn conflicting_pick_is_concluded_by_commit(sandbox: Sandbox) {
    topic_with_fix(&sandbox).await;
    sandbox
        .commit_files(&[("lib.txt", "alpha\nbeta\ngamma!\n")], "excite gamma")
        .await;
    let head = sandbox.head();

    let outcome = sandbox.repository.cherry_pick("topic", None).await.unwrap();
    assert_eq!(outcome, PickOutcome::Conflicted(vec![PathBuf::from("lib.txt")]));
    assert!(sandbox.read("lib.txt").contains(">>>>>>> "));

    // another operation cannot start meanwhile
    let err = sandbox.repository.merge("topic").await.unwrap_err();
    assert!(matches!(classify(&err), Some(RepositoryError::InvalidState(_))));

    sandbox.write("lib.txt", "alpha\nbeta\nGAMMA!\n");
    sandbox.add_all().await;
    let picked = sandbox.repository.commit("").await.unwrap();

    let commit = sandbox.repository.database().load_commit(&picked).unwrap();
    assert_eq!(commit.parents(), &[head]);
    assert_eq!(commit.short_message(), "fix gamma");
    assert_eq!(sandbox.tree_of("HEAD")["lib.txt"], "alpha\nbeta\nGAMMA!\n");
}

#[rstest]
#[tokio::test]
async fn merge_commits_need_a_mainline(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "root").await;
    repository.create_branch("side", None).unwrap();
    sandbox.commit_files(&[("main.txt", "main\n")], "main change").await;
    repository.checkout("side").await.unwrap();
    sandbox.commit_files(&[("side.txt", "side\n")], "side change").await;
    repository.checkout("main").await.unwrap();
    repository.merge("side").await.unwrap();
    let merge = sandbox.head().to_string();

    repository.create_branch("replay", Some("main~1")).unwrap();
    repository.checkout("replay").await.unwrap();

    let err = repository.cherry_pick(&merge, None).await.unwrap_err();
    assert!(matches!(classify(&err), Some(RepositoryError::InvalidState(_))));
    let err = repository.cherry_pick(&merge, Some(3)).await.unwrap_err();
    assert!(matches!(classify(&err), Some(RepositoryError::InvalidState(_))));

    let outcome = repository.cherry_pick(&merge, Some(1)).await.unwrap();

    assert!(matches!(outcome, PickOutcome::Committed(_)));
    assert_eq!(sandbox.read("side.txt"), "side\n");
    assert_eq!(sandbox.read("main.txt"), "main\n");
}
