use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;
use twig::artifacts::objects::object::ObjectBox;

#[rstest]
fn identical_content_is_stored_once(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    let before = repository.database().all_objects().unwrap().len();

    let first = repository.hash_object(b"same bytes\n", true).unwrap();
    let second = repository.hash_object(b"same bytes\n", true).unwrap();

    assert_eq!(first, second);
    assert_eq!(repository.database().all_objects().unwrap().len(), before + 1);
}

#[rstest]
fn hashing_without_write_stores_nothing(sandbox: Sandbox) {
    let repository = &sandbox.repository;

    let oid = repository.hash_object(b"ephemeral\n", false).unwrap();

    assert!(!repository.database().exists(&oid));
    assert_eq!(repository.hash_object(b"ephemeral\n", true).unwrap(), oid);
    assert!(repository.database().exists(&oid));
}

#[rstest]
fn blob_ids_match_the_classic_format(sandbox: Sandbox) {
    let oid = sandbox.repository.hash_object(b"hello\n", false).unwrap();

    assert_eq!(oid.to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");
}

#[rstest]
#[tokio::test]
async fn commits_and_trees_read_back(sandbox: Sandbox) {
    let repository = &sandbox.repository;
    let commit = sandbox
        .commit_files(&[("top.txt", "top\n"), ("dir/nested.txt", "nested\n")], "layout")
        .await;

    let (_, object) = repository.cat_file(&commit.to_string()).unwrap();
    let ObjectBox::Commit(loaded) = object else {
        panic!("expected a commit");
    };
    assert_eq!(loaded.short_message(), "layout");
    assert!(loaded.parents().is_empty());

    let listing = repository.ls_tree("HEAD").unwrap();
    assert_eq!(
        listing.keys().cloned().collect::<Vec<_>>(),
        vec![PathBuf::from("dir/nested.txt"), PathBuf::from("top.txt")]
    );
    let blob = repository
        .database()
        .load_blob(&listing[&PathBuf::from("dir/nested.txt")].oid)
        .unwrap();
    assert_eq!(blob.content().as_ref(), b"nested\n");
}
