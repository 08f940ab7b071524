use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use twig::commands::porcelain::reset::ResetMode;

#[rstest]
#[tokio::test]
async fn recommitting_after_a_soft_reset_keeps_the_tree(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "1\n")], "first").await;
    let original = sandbox
        .commit_files(&[("a.txt", "2\n"), ("b.txt", "new\n")], "second")
        .await;
    let original_tree = sandbox.tree_oid("HEAD");

    let target = repository.reset(ResetMode::Soft, "HEAD~1").await.unwrap();
    assert_eq!(target, sandbox.rev("main"));
    assert_eq!(repository.refs().orig_head().unwrap(), Some(original.clone()));
    // nothing but HEAD moved
    assert_eq!(sandbox.read("a.txt"), "2\n");

    let rewritten = repository.commit("second, reworded").await.unwrap();

    assert_ne!(rewritten, original);
    assert_eq!(sandbox.tree_oid("HEAD"), original_tree);
    assert_eq!(sandbox.subjects("HEAD"), vec!["second, reworded", "first"]);

    // the replaced commit is still recorded in the branch reflog
    let reflog = repository.reflog("main").unwrap();
    assert!(reflog.iter().any(|entry| entry.new_oid.as_ref() == Some(&original)));
}
