use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn unborn_branch_has_an_empty_log(sandbox: Sandbox) {
    assert!(sandbox.repository.log(None, false).unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn first_parent_walk_skips_merged_branches(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "root").await;
    repository.create_branch("side", None).unwrap();
    sandbox.commit_files(&[("b.txt", "b\n")], "main change").await;
    repository.checkout("side").await.unwrap();
    sandbox.commit_files(&[("c.txt", "c\n")], "side change").await;
    repository.checkout("main").await.unwrap();
    repository.merge("side").await.unwrap();

    let subjects = |first_parent| {
        repository
            .log(None, first_parent)
            .unwrap()
            .into_iter()
            .map(|(_, commit)| commit.short_message())
            .collect::<Vec<_>>()
    };

    assert_eq!(
        subjects(true),
        vec!["Merge branch 'side'", "main change", "root"]
    );
    assert_eq!(
        subjects(false),
        vec!["Merge branch 'side'", "side change", "main change", "root"]
    );
}

#[rstest]
#[tokio::test]
async fn revision_syntax_reaches_older_commits(sandbox: Sandbox) {
    let first = sandbox.commit_files(&[("a.txt", "1\n")], "one").await;
    let second = sandbox.commit_files(&[("a.txt", "2\n")], "two").await;
    sandbox.commit_files(&[("a.txt", "3\n")], "three").await;

    assert_eq!(sandbox.rev("HEAD~2"), first);
    assert_eq!(sandbox.rev("@^"), second);
    assert_eq!(sandbox.rev("main~1^"), first);
    assert_eq!(sandbox.rev(&second.to_short_oid()), second);
    assert_eq!(sandbox.subjects("HEAD~1"), vec!["two", "one"]);
}
