use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::{Arc, Mutex};
use twig::areas::config::{Config, FastForward};
use twig::areas::hooks::{HookDecision, HookPoint};
use twig::errors::{RepositoryError, classify};

#[rstest]
#[tokio::test]
async fn pre_commit_denial_leaves_head_alone(mut sandbox: Sandbox) {
    sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    let head = sandbox.head();
    sandbox.repository.register_hook(
        HookPoint::PreCommit,
        Box::new(|context| {
            if context.message.starts_with("WIP") {
                HookDecision::Deny("work in progress".to_string())
            } else {
                HookDecision::Allow
            }
        }),
    );

    sandbox.write("a.txt", "b\n");
    sandbox.add_all().await;
    let err = sandbox.repository.commit("WIP: half done").await.unwrap_err();

    match classify(&err) {
        Some(RepositoryError::HookRejected { hook, reason }) => {
            assert_eq!(hook, "pre-commit");
            assert_eq!(reason, "work in progress");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(sandbox.head(), head);
    assert_eq!(sandbox.repository.reflog("main").unwrap().len(), 1);

    sandbox.repository.commit("done").await.unwrap();
    assert_eq!(sandbox.subjects("HEAD"), vec!["done", "first"]);
}

#[rstest]
#[tokio::test]
async fn post_commit_sees_the_new_commit(mut sandbox: Sandbox) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    sandbox.repository.register_hook(
        HookPoint::PostCommit,
        Box::new(move |context| {
            recorder.lock().unwrap().extend(context.commit.clone());
            HookDecision::Deny("ignored after the fact".to_string())
        }),
    );

    let first = sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    let second = sandbox.commit_files(&[("a.txt", "b\n")], "second").await;

    assert_eq!(*seen.lock().unwrap(), vec![first, second]);
}

#[rstest]
#[tokio::test]
async fn merge_commits_run_their_own_hook() {
    let mut config = Config::default();
    config.merge.fast_forward = FastForward::Never;
    let mut sandbox = Sandbox::new(config);
    sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    sandbox.repository.create_branch("topic", None).unwrap();
    sandbox.repository.checkout("topic").await.unwrap();
    sandbox.commit_files(&[("t.txt", "t\n")], "topic").await;
    sandbox.repository.checkout("main").await.unwrap();
    let head = sandbox.head();
    let orig_head = sandbox.repository.refs().orig_head().unwrap();

    sandbox.repository.register_hook(
        HookPoint::PreMergeCommit,
        Box::new(|_| HookDecision::Deny("merges are frozen".to_string())),
    );
    let err = sandbox.repository.merge("topic").await.unwrap_err();

    assert!(matches!(classify(&err), Some(RepositoryError::HookRejected { .. })));
    assert_eq!(sandbox.head(), head);
    assert_eq!(sandbox.repository.refs().orig_head().unwrap(), orig_head);
    assert!(!sandbox.exists("t.txt"));
    assert!(sandbox.repository.status().await.unwrap().is_clean());
}
