use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use twig::errors::{RepositoryError, classify};

#[rstest]
#[tokio::test]
async fn lightweight_tag_points_at_the_commit(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    let first = sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    sandbox.commit_files(&[("a.txt", "b\n")], "second").await;

    repository.create_tag("v1", Some("HEAD~1"), None).unwrap();

    let tags = repository.list_tags().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].0.short_name(), "v1");
    assert_eq!(tags[0].1, first);
    assert_eq!(sandbox.rev("v1"), first);
}

#[rstest]
#[tokio::test]
async fn annotated_tag_peels_to_its_commit(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    let head = sandbox.commit_files(&[("a.txt", "a\n")], "first").await;

    repository.create_tag("v2", None, Some("release two")).unwrap();

    let (_, tag_oid) = repository.list_tags().unwrap().remove(0);
    assert_ne!(tag_oid, head);
    assert_eq!(sandbox.rev("v2"), head);
    let shown = repository.cat_file(&tag_oid.to_string()).unwrap().1.display();
    assert!(shown.contains("release two"), "{shown}");
    assert!(shown.contains(&head.to_string()));
}

#[rstest]
#[tokio::test]
async fn tags_are_unique_and_deletable(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    repository.create_tag("v1", None, None).unwrap();

    let err = repository.create_tag("v1", None, None).unwrap_err();
    assert!(matches!(classify(&err), Some(RepositoryError::RefExists { .. })));

    repository.delete_tag("v1").unwrap();
    assert!(repository.list_tags().unwrap().is_empty());

    let err = repository.delete_tag("v1").unwrap_err();
    assert!(matches!(classify(&err), Some(RepositoryError::NotFound { .. })));
}
