use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use twig::areas::refs::Head;
use twig::artifacts::index::index_entry::Stage;
use twig::artifacts::rebase::{RebaseOutcome, StopReason, SuspendedRebase};
use twig::errors::{RepositoryError, classify};

/// Both branches rewrite the same line of `greeting.txt`
#[fixture]
async fn clashing(sandbox: Sandbox) -> Sandbox {
    let repository = &sandbox.repository;
    sandbox
        .commit_files(&[("greeting.txt", "hello\nworld\n")], "base")
        .await;
    repository.create_branch("topic", None).unwrap();
    sandbox
        .commit_files(&[("greeting.txt", "hello\nmain\n")], "main greeting")
        .await;

    repository.checkout("topic").await.unwrap();
    sandbox
        .commit_files(&[("greeting.txt", "hello\ntopic\n")], "topic greeting")
        .await;
    sandbox.commit_files(&[("later.txt", "later\n")], "later work").await;

    sandbox
}

async fn pause(sandbox: &Sandbox) -> SuspendedRebase {
    let plan = sandbox.repository.rebase_plan("main").unwrap();
    match sandbox.repository.rebase(plan).await.unwrap() {
        RebaseOutcome::Paused(state) => state,
        outcome => panic!("expected a conflict, got {outcome:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn conflict_pauses_with_the_remaining_work(#[future] clashing: Sandbox) {
    let sandbox = clashing.await;
    let old_topic = sandbox.rev("topic");

    let state = pause(&sandbox).await;

    let stop = state.stopped.as_ref().unwrap();
    assert_eq!(stop.reason, StopReason::Conflict);
    assert_eq!(stop.item.subject, "topic greeting");
    assert_eq!(state.remaining.len(), 1);
    assert_eq!(state.orig_head, old_topic);
    assert_eq!(sandbox.rev("topic"), old_topic);
    assert!(matches!(sandbox.repository.refs().head().unwrap(), Head::Detached(_)));
    assert_eq!(
        sandbox.stages("greeting.txt").await,
        vec![Stage::Base, Stage::Ours, Stage::Theirs]
    );
    assert!(sandbox.read("greeting.txt").contains("<<<<<<< HEAD\n"));
}

#[rstest]
#[tokio::test]
async fn continue_requires_resolution_then_finishes(#[future] clashing: Sandbox) {
    let sandbox = clashing.await;
    let repository = &sandbox.repository;
    let state = pause(&sandbox).await;

    let err = repository.rebase_continue(state.clone()).await.unwrap_err();
    assert!(matches!(classify(&err), Some(RepositoryError::InvalidState(_))));

    sandbox.write("greeting.txt", "hello\nmain and topic\n");
    sandbox.add_all().await;
    let outcome = repository.rebase_continue(state).await.unwrap();

    let RebaseOutcome::Completed(tip) = outcome else {
        panic!("expected the rebase to finish, got {outcome:?}");
    };
    assert_eq!(sandbox.rev("topic"), tip);
    assert_eq!(
        sandbox.subjects("topic"),
        vec!["later work", "topic greeting", "main greeting", "base"]
    );
    assert_eq!(sandbox.tree_of("topic")["greeting.txt"], "hello\nmain and topic\n");
    assert!(matches!(repository.refs().head().unwrap(), Head::Attached(_)));
    assert!(repository.status().await.unwrap().is_clean());
}

#[rstest]
#[tokio::test]
async fn abort_restores_branch_and_files(#[future] clashing: Sandbox) {
    let sandbox = clashing.await;
    let repository = &sandbox.repository;
    let old_topic = sandbox.rev("topic");
    let files = sandbox.files();
    let state = pause(&sandbox).await;

    let restored = repository.rebase_abort(state).await.unwrap();

    assert_eq!(restored, old_topic);
    assert_eq!(sandbox.rev("topic"), old_topic);
    assert_eq!(sandbox.files(), files);
    assert_eq!(sandbox.stages("greeting.txt").await, vec![Stage::Normal]);
    assert_eq!(
        repository.refs().current_branch().unwrap().map(|branch| branch.to_string()),
        Some("refs/heads/topic".to_string())
    );
}

#[rstest]
#[tokio::test]
async fn abort_keeps_unstaged_edits_to_untouched_files(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox
        .commit_files(&[("greeting.txt", "hello\n"), ("notes.txt", "v1\n")], "base")
        .await;
    repository.create_branch("topic", None).unwrap();
    sandbox.commit_files(&[("greeting.txt", "main\n")], "main greeting").await;
    repository.checkout("topic").await.unwrap();
    sandbox.commit_files(&[("greeting.txt", "topic\n")], "topic greeting").await;

    sandbox.write("notes.txt", "unsaved local work\n");
    let state = pause(&sandbox).await;
    assert_eq!(sandbox.read("notes.txt"), "unsaved local work\n");

    repository.rebase_abort(state).await.unwrap();

    assert_eq!(sandbox.read("notes.txt"), "unsaved local work\n");
    assert_eq!(sandbox.read("greeting.txt"), "topic\n");
    assert_eq!(sandbox.stages("greeting.txt").await, vec![Stage::Normal]);
}

#[rstest]
#[tokio::test]
async fn state_round_trips_through_the_git_dir(#[future] clashing: Sandbox) {
    let sandbox = clashing.await;
    let git_dir = sandbox.repository.git_dir();
    let state = pause(&sandbox).await;

    state.save(git_dir).unwrap();
    let loaded = SuspendedRebase::load(git_dir).unwrap();

    assert_eq!(loaded, Some(state.clone()));

    // a second rebase cannot start while one is recorded
    let plan = sandbox.repository.rebase_plan("main").unwrap();
    assert!(sandbox.repository.rebase(plan).await.is_err());

    SuspendedRebase::clear(git_dir).unwrap();
    assert_eq!(SuspendedRebase::load(git_dir).unwrap(), None);
}
