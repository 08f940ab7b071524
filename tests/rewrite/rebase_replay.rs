use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use twig::areas::refs::Head;
use twig::artifacts::rebase::RebaseOutcome;
use twig::artifacts::rebase::todo::TodoAction;

/// `topic` holds three commits on top of `base`; `main` moved on separately
#[fixture]
async fn diverged(sandbox: Sandbox) -> Sandbox {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("base.txt", "base\n")], "base").await;
    repository.create_branch("topic", None).unwrap();

    sandbox.commit_files(&[("main.txt", "main\n")], "main work").await;

    repository.checkout("topic").await.unwrap();
    sandbox.commit_files(&[("t1.txt", "one\n")], "topic one").await;
    sandbox.commit_files(&[("t2.txt", "two\n")], "topic two").await;
    sandbox.commit_files(&[("t3.txt", "three\n")], "topic three").await;

    sandbox
}

#[rstest]
#[tokio::test]
async fn branch_on_top_of_target_is_up_to_date(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "base").await;
    repository.create_branch("topic", None).unwrap();
    repository.checkout("topic").await.unwrap();
    let tip = sandbox.commit_files(&[("b.txt", "b\n")], "ahead").await;

    let plan = repository.rebase_plan("main").unwrap();
    let outcome = repository.rebase(plan).await.unwrap();

    assert_eq!(outcome, RebaseOutcome::UpToDate);
    assert_eq!(sandbox.rev("topic"), tip);
    let reflog = repository.reflog("topic").unwrap();
    assert!(reflog.iter().all(|entry| !entry.operation.starts_with("rebase")));
}

#[rstest]
#[tokio::test]
async fn picks_replay_onto_the_target(#[future] diverged: Sandbox) {
    let sandbox = diverged.await;
    let repository = &sandbox.repository;
    let main = sandbox.rev("main");
    let old_topic = sandbox.rev("topic");

    let plan = repository.rebase_plan("main").unwrap();
    assert_eq!(
        plan.items.iter().map(|item| item.subject.as_str()).collect::<Vec<_>>(),
        vec!["topic one", "topic two", "topic three"]
    );

    let outcome = repository.rebase(plan).await.unwrap();

    let RebaseOutcome::Completed(tip) = outcome else {
        panic!("expected the rebase to finish, got {outcome:?}");
    };
    assert_eq!(sandbox.rev("topic"), tip);
    assert_eq!(sandbox.rev("main"), main);
    assert_eq!(
        sandbox.subjects("topic"),
        vec!["topic three", "topic two", "topic one", "main work", "base"]
    );
    assert!(repository.is_ancestor("main", "topic").unwrap());
    assert_eq!(sandbox.rev("ORIG_HEAD"), old_topic);
    assert!(matches!(repository.refs().head().unwrap(), Head::Attached(_)));
    assert_eq!(sandbox.files(), sandbox.tree_of("HEAD"));

    // the branch moved exactly once
    let reflog = repository.reflog("topic").unwrap();
    assert_eq!(reflog[0].new_oid, Some(tip));
    assert_eq!(reflog[0].old_oid.as_ref(), Some(&old_topic));
}

#[rstest]
#[tokio::test]
async fn edited_plan_rewords_squashes_and_drops(#[future] diverged: Sandbox) {
    let sandbox = diverged.await;
    let repository = &sandbox.repository;

    let mut plan = repository.rebase_plan("main").unwrap();
    plan.items[1].action = TodoAction::Squash;
    plan.items[2].action = TodoAction::Drop;
    let outcome = repository.rebase(plan).await.unwrap();

    assert!(matches!(outcome, RebaseOutcome::Completed(_)));
    assert_eq!(sandbox.subjects("HEAD"), vec!["topic one", "main work", "base"]);
    let head = repository.database().load_commit(&sandbox.head()).unwrap();
    assert_eq!(head.message(), "topic one\n\ntopic two\n");
    assert!(sandbox.exists("t1.txt"));
    assert!(sandbox.exists("t2.txt"));
    assert!(!sandbox.exists("t3.txt"));
}

#[rstest]
#[tokio::test]
async fn fixup_keeps_message_and_reword_replaces_it(#[future] diverged: Sandbox) {
    let sandbox = diverged.await;
    let repository = &sandbox.repository;

    let mut plan = repository.rebase_plan("main").unwrap();
    plan.items[0].action = TodoAction::Reword("first, reworded".to_string());
    plan.items[1].action = TodoAction::Fixup;
    repository.rebase(plan).await.unwrap();

    assert_eq!(
        sandbox.subjects("HEAD"),
        vec!["topic three", "first, reworded", "main work", "base"]
    );
    assert_eq!(sandbox.tree_of("HEAD~1")["t2.txt"], "two\n");
}

#[rstest]
#[tokio::test]
async fn folding_the_first_item_is_refused(#[future] diverged: Sandbox) {
    let sandbox = diverged.await;
    let repository = &sandbox.repository;

    let mut plan = repository.rebase_plan("main").unwrap();
    plan.items[0].action = TodoAction::Squash;

    assert!(repository.rebase(plan).await.is_err());
}

#[rstest]
#[tokio::test]
async fn edit_stops_for_an_amend(#[future] diverged: Sandbox) {
    let sandbox = diverged.await;
    let repository = &sandbox.repository;

    let mut plan = repository.rebase_plan("main").unwrap();
    plan.items[1].action = TodoAction::Edit;
    let RebaseOutcome::Paused(state) = repository.rebase(plan).await.unwrap() else {
        panic!("expected the rebase to stop at the edit");
    };
    assert_eq!(state.remaining.len(), 1);
    assert!(matches!(repository.refs().head().unwrap(), Head::Detached(_)));

    sandbox.write("t2.txt", "two, amended\n");
    sandbox.add_all().await;
    repository.amend(Some("topic two, amended")).await.unwrap();

    let outcome = repository.rebase_continue(state).await.unwrap();

    assert!(matches!(outcome, RebaseOutcome::Completed(_)));
    assert_eq!(
        sandbox.subjects("topic"),
        vec!["topic three", "topic two, amended", "topic one", "main work", "base"]
    );
    assert_eq!(sandbox.tree_of("topic")["t2.txt"], "two, amended\n");
}
