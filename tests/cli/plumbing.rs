use crate::common::command::{init_repository_dir, run_twig_command, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::rstest;

#[rstest]
fn hash_object_then_cat_file(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(dir, "greeting.txt", "hello\n");

    run_twig_command(dir, &["hash-object", "greeting.txt"])
        .assert()
        .success()
        .stdout("ce013625030ba8dba906f756967f9e9ca394464a\n");
    run_twig_command(dir, &["cat-file", "-p", "ce01362"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("not found"));

    run_twig_command(dir, &["hash-object", "-w", "greeting.txt"])
        .assert()
        .success();
    run_twig_command(dir, &["cat-file", "-p", "ce01362"])
        .assert()
        .success()
        .stdout("hello\n");
}

#[rstest]
fn ls_tree_lists_nested_files(init_repository_dir: TempDir) {
    run_twig_command(init_repository_dir.path(), &["ls-tree"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(
            r"^100644 blob [0-9a-f]{40}\t1\.txt\n100644 blob [0-9a-f]{40}\ta/2\.txt\n100644 blob [0-9a-f]{40}\ta/b/3\.txt\n$",
        )
        .unwrap());
}

#[rstest]
fn merge_base_of_diverged_branches(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let base = run_twig_command(dir, &["log"]).output().unwrap();
    let base = String::from_utf8(base.stdout).unwrap();
    let base = base
        .lines()
        .find_map(|line| line.strip_prefix("commit "))
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap()
        .to_string();

    run_twig_command(dir, &["branch", "topic"]).assert().success();
    write_file(dir, "1.txt", "main\n");
    run_twig_command(dir, &["add", "1.txt"]).assert().success();
    run_twig_command(dir, &["commit", "-m", "Main moves"]).assert().success();

    run_twig_command(dir, &["merge-base", "main", "topic"])
        .assert()
        .success()
        .stdout(format!("{base}\n"));
}

#[rstest]
fn gc_and_fsck_on_a_healthy_repository(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(dir, "loose.txt", "unreferenced\n");
    run_twig_command(dir, &["hash-object", "-w", "loose.txt"])
        .assert()
        .success();

    run_twig_command(dir, &["gc"])
        .assert()
        .success()
        .stdout("Removed 1 unreachable objects, kept 7\n");
    run_twig_command(dir, &["fsck"])
        .assert()
        .success()
        .stdout("Checked 7 objects\n");
}
