use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use twig::commands::porcelain::reset::ResetMode;
use twig::errors::{RepositoryError, classify};

#[rstest]
#[tokio::test]
async fn gc_removes_only_unreachable_objects(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    let orphan = repository.hash_object(b"nobody points here\n", true).unwrap();
    let staged = repository.stage(std::path::Path::new("b.txt"), b"staged\n").await.unwrap();

    let report = repository.gc().await.unwrap();

    assert_eq!(report.removed, vec![orphan.clone()]);
    assert!(!repository.database().exists(&orphan));
    assert!(repository.database().exists(&staged));
    assert!(repository.fsck().unwrap().is_ok());
}

#[rstest]
#[tokio::test]
async fn reflog_and_stash_keep_objects_alive(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    let dropped = sandbox.commit_files(&[("a.txt", "b\n")], "dropped").await;
    repository.reset(ResetMode::Hard, "HEAD~1").await.unwrap();

    sandbox.write("a.txt", "stashed\n");
    let stash = repository.stash_push(None).await.unwrap();

    let report = repository.gc().await.unwrap();

    assert!(report.removed.is_empty(), "{:?}", report.removed);
    assert!(repository.database().exists(&dropped));
    assert!(repository.database().exists(&stash));
    assert_eq!(report.kept, repository.database().all_objects().unwrap().len());
}

#[rstest]
#[tokio::test]
async fn fsck_reports_damaged_objects(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    sandbox.commit_files(&[("a.txt", "a\n")], "first").await;
    let blob = repository.hash_object(b"a\n", false).unwrap();

    let healthy = repository.fsck().unwrap();
    assert!(healthy.is_ok());
    assert_eq!(healthy.checked, 3);

    let path = repository.database().objects_path().join(blob.to_path());
    std::fs::write(&path, b"not zlib at all").unwrap();

    let report = repository.fsck().unwrap();
    assert!(!report.is_ok());
    assert_eq!(report.corrupt.iter().map(|(oid, _)| oid).collect::<Vec<_>>(), vec![&blob]);
    assert!(!report.broken_links.is_empty());

    let err = repository.database().load_blob(&blob).unwrap_err();
    assert!(matches!(classify(&err), Some(RepositoryError::Corrupt { .. })));
}
