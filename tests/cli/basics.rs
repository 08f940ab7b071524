use crate::common::command::{
    head_subjects, init_repository_dir, read_file, repository_dir, run_twig_command, twig_commit,
    write_file,
};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

#[test]
fn init_creates_the_metadata_directory() {
    let dir = TempDir::new().unwrap();

    run_twig_command(dir.path(), &["init", "project"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Initialized twig repository at"));

    dir.child("project/.twig/HEAD").assert(predicate::path::is_file());
    dir.child("project/.twig/objects").assert(predicate::path::is_dir());
}

#[test]
fn commands_outside_a_repository_fail() {
    let dir = TempDir::new().unwrap();

    run_twig_command(dir.path(), &["status"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("error:"));
}

#[rstest]
fn first_commit_shows_up_in_the_log(repository_dir: TempDir) {
    write_file(repository_dir.path(), "hello.txt", "hello\n");
    run_twig_command(repository_dir.path(), &["add", "hello.txt"])
        .assert()
        .success();

    twig_commit(repository_dir.path(), "Say hello")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\[main [0-9a-f]{7}\] Say hello\n$").unwrap());

    run_twig_command(repository_dir.path(), &["log", "--oneline"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9a-f]{7} \(HEAD -> main\) Say hello\n$").unwrap());
}

#[rstest]
fn porcelain_status_lists_two_letter_codes(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(dir, "1.txt", "changed\n");
    write_file(dir, "staged.txt", "new\n");
    write_file(dir, "untracked.txt", "??\n");
    std::fs::remove_file(dir.join("a/2.txt")).unwrap();
    run_twig_command(dir, &["add", "staged.txt"]).assert().success();

    run_twig_command(dir, &["status", "--porcelain"])
        .assert()
        .success()
        .stdout(" M 1.txt\n D a/2.txt\nA  staged.txt\n?? untracked.txt\n");
}

#[rstest]
fn long_status_of_a_clean_tree(init_repository_dir: TempDir) {
    run_twig_command(init_repository_dir.path(), &["status"])
        .assert()
        .success()
        .stdout("On branch main\nnothing to commit, working tree clean\n");
}

#[rstest]
fn branches_and_checkout(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();

    run_twig_command(dir, &["branch", "topic"]).assert().success();
    run_twig_command(dir, &["branch"])
        .assert()
        .success()
        .stdout("* main\n  topic\n");

    run_twig_command(dir, &["checkout", "topic"])
        .assert()
        .success()
        .stdout("Switched to branch 'topic'\n");
    write_file(dir, "topic.txt", "topic\n");
    run_twig_command(dir, &["add", "."]).assert().success();
    twig_commit(dir, "Topic work").assert().success();

    run_twig_command(dir, &["checkout", "main"]).assert().success();
    assert!(!dir.join("topic.txt").exists());

    run_twig_command(dir, &["branch", "-d", "topic"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("not fully merged"));
    run_twig_command(dir, &["branch", "-D", "topic"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Deleted branch topic (was "));
}

#[rstest]
fn hard_reset_and_reflog(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(dir, "1.txt", "second\n");
    run_twig_command(dir, &["add", "1.txt"]).assert().success();
    twig_commit(dir, "Second commit").assert().success();

    run_twig_command(dir, &["reset", "--hard", "HEAD~1"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("] Initial commit\n"));

    assert_eq!(read_file(dir, "1.txt"), "one\n");
    assert_eq!(head_subjects(dir), vec!["Initial commit"]);
    run_twig_command(dir, &["reflog", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main@{0}: reset: moving to HEAD~1"))
        .stdout(predicate::str::contains("main@{1}: commit: Second commit"));
}

#[rstest]
fn stash_round_trip(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(dir, "1.txt", "work in progress\n");

    run_twig_command(dir, &["stash", "push", "-m", "halfway"])
        .assert()
        .success()
        .stdout("Saved working directory and index state On main: halfway\n");
    assert_eq!(read_file(dir, "1.txt"), "one\n");

    run_twig_command(dir, &["stash", "list"])
        .assert()
        .success()
        .stdout("stash@{0}: On main: halfway\n");
    run_twig_command(dir, &["stash", "pop"]).assert().success();

    assert_eq!(read_file(dir, "1.txt"), "work in progress\n");
    run_twig_command(dir, &["stash", "list"]).assert().success().stdout("");
}

#[rstest]
fn log_level_comes_from_the_environment(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(dir, "1.txt", "logged\n");
    run_twig_command(dir, &["add", "1.txt"]).assert().success();

    twig_commit(dir, "Logged commit")
        .env("TWIG_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("commit recorded"));
}
