use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use twig::areas::refs::Head;
use twig::errors::{RepositoryError, classify};

/// `main` and `topic` disagree on `shared.txt`; only `topic` has `topic.txt`
#[fixture]
async fn two_branches(sandbox: Sandbox) -> Sandbox {
    let repository = &sandbox.repository;
    sandbox
        .commit_files(&[("shared.txt", "main\n"), ("stable.txt", "stable\n")], "base")
        .await;
    repository.create_branch("topic", None).unwrap();
    repository.checkout("topic").await.unwrap();
    sandbox
        .commit_files(&[("shared.txt", "topic\n"), ("topic.txt", "t\n")], "topic work")
        .await;
    repository.checkout("main").await.unwrap();

    sandbox
}

#[rstest]
#[tokio::test]
async fn branch_checkout_attaches_head(#[future] two_branches: Sandbox) {
    let sandbox = two_branches.await;

    let head = sandbox.repository.checkout("topic").await.unwrap();

    assert_eq!(sandbox.repository.refs().head().unwrap(), head);
    assert_eq!(
        sandbox.repository.refs().current_branch().unwrap().map(|b| b.to_string()),
        Some("refs/heads/topic".to_string())
    );
    assert_eq!(sandbox.files(), sandbox.tree_of("topic"));
}

#[rstest]
#[case::commit_id(None)]
#[case::relative(Some("topic~1"))]
#[case::tag(Some("v1"))]
#[tokio::test]
async fn other_revisions_detach_head(#[case] target: Option<&str>, #[future] two_branches: Sandbox) {
    let sandbox = two_branches.await;
    sandbox.repository.create_tag("v1", Some("topic"), None).unwrap();
    let target = target.map_or_else(|| sandbox.rev("topic").to_string(), str::to_string);
    let expected = sandbox.rev(&target);

    let head = sandbox.repository.checkout(&target).await.unwrap();

    assert_eq!(head, Head::Detached(expected.clone()));
    assert_eq!(sandbox.head(), expected);
    assert_eq!(sandbox.repository.refs().current_branch().unwrap(), None);
    assert_eq!(sandbox.files(), sandbox.tree_of(&target));
}

#[rstest]
#[tokio::test]
async fn unrelated_local_changes_are_carried(#[future] two_branches: Sandbox) {
    let sandbox = two_branches.await;
    sandbox.write("stable.txt", "edited\n");
    sandbox.write("notes.txt", "untracked\n");

    sandbox.repository.checkout("topic").await.unwrap();

    assert_eq!(sandbox.read("stable.txt"), "edited\n");
    assert_eq!(sandbox.read("notes.txt"), "untracked\n");
    assert_eq!(sandbox.read("shared.txt"), "topic\n");
}

#[rstest]
#[case::modified_file("shared.txt")]
#[case::untracked_file("topic.txt")]
#[tokio::test]
async fn colliding_local_changes_block_the_switch(
    #[case] path: &str,
    #[future] two_branches: Sandbox,
) {
    let sandbox = two_branches.await;
    let head = sandbox.head();
    sandbox.write(path, "precious\n");
    let files = sandbox.files();

    let err = sandbox.repository.checkout("topic").await.unwrap_err();

    assert!(matches!(classify(&err), Some(RepositoryError::InvalidState(_))));
    assert!(err.to_string().contains(path), "{err}");
    assert_eq!(sandbox.files(), files);
    assert_eq!(sandbox.head(), head);
    assert_eq!(
        sandbox.repository.refs().current_branch().unwrap().map(|b| b.to_string()),
        Some("refs/heads/main".to_string())
    );
}
