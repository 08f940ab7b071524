use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

/// ```text
///   a ── b ── c ── m      (main)
///         \       /
///          d ── e         (side)
///                \
///                 f       (tip)
/// ```
#[fixture]
async fn forked(sandbox: Sandbox) -> Sandbox {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "a").await;
    sandbox.commit_files(&[("b.txt", "b\n")], "b").await;
    repository.create_branch("side", None).unwrap();
    sandbox.commit_files(&[("c.txt", "c\n")], "c").await;

    repository.checkout("side").await.unwrap();
    sandbox.commit_files(&[("d.txt", "d\n")], "d").await;
    sandbox.commit_files(&[("e.txt", "e\n")], "e").await;
    repository.create_branch("tip", None).unwrap();
    repository.checkout("tip").await.unwrap();
    sandbox.commit_files(&[("f.txt", "f\n")], "f").await;

    repository.checkout("main").await.unwrap();
    repository.merge("side").await.unwrap();
    sandbox
}

#[rstest]
#[case("main", "tip", "side")]
#[case("tip", "main", "side")]
#[case("main~1", "side", "main~2")]
#[case("side", "side", "side")]
#[case("main", "main", "main")]
#[tokio::test]
async fn merge_base_is_symmetric_and_reflexive(
    #[future] forked: Sandbox,
    #[case] a: &str,
    #[case] b: &str,
    #[case] expected: &str,
) {
    let sandbox = forked.await;
    let repository = &sandbox.repository;

    let forward = repository.merge_base(a, b).unwrap();
    let backward = repository.merge_base(b, a).unwrap();

    assert_eq!(forward, Some(sandbox.rev(expected)));
    assert_eq!(forward, backward);
}

#[rstest]
#[tokio::test]
async fn ancestry_follows_every_parent(#[future] forked: Sandbox) {
    let sandbox = forked.await;
    let repository = &sandbox.repository;

    assert!(repository.is_ancestor("side", "main").unwrap());
    assert!(repository.is_ancestor("main~2", "tip").unwrap());
    assert!(repository.is_ancestor("main", "main").unwrap());
    assert!(!repository.is_ancestor("tip", "main").unwrap());
    assert!(!repository.is_ancestor("main", "side").unwrap());
}

#[tokio::test]
async fn unrelated_histories_have_no_merge_base() {
    let sandbox = Sandbox::new(Default::default());
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "a").await;

    let orphan = repository
        .commit_tree(&repository.write_tree().await.unwrap(), vec![], "orphan")
        .unwrap();

    assert_eq!(repository.merge_base("main", &orphan.to_string()).unwrap(), None);
}
