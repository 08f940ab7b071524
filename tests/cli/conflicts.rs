use crate::common::command::{
    head_subjects, init_repository_dir, read_file, run_twig_command, twig_commit, write_file,
};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::{fixture, rstest};
use std::path::Path;

fn commit_change(dir: &Path, path: &str, content: &str, message: &str) {
    write_file(dir, path, content);
    run_twig_command(dir, &["add", path]).assert().success();
    twig_commit(dir, message).assert().success();
}

/// `main` and `topic` both rewrote `1.txt`; `main` is checked out
#[fixture]
fn diverged(init_repository_dir: TempDir) -> TempDir {
    let dir = init_repository_dir.path();
    run_twig_command(dir, &["branch", "topic"]).assert().success();
    run_twig_command(dir, &["checkout", "topic"]).assert().success();
    commit_change(dir, "1.txt", "topic\n", "Topic edit");
    run_twig_command(dir, &["checkout", "main"]).assert().success();
    commit_change(dir, "1.txt", "main\n", "Main edit");

    init_repository_dir
}

#[rstest]
fn conflicted_merge_is_resolved_with_commit(diverged: TempDir) {
    let dir = diverged.path();

    run_twig_command(dir, &["merge", "topic"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("CONFLICT (content): Merge conflict in 1.txt"));

    assert_eq!(
        read_file(dir, "1.txt"),
        "<<<<<<< HEAD\nmain\n=======\ntopic\n>>>>>>> topic\n"
    );
    run_twig_command(dir, &["status", "--porcelain"])
        .assert()
        .success()
        .stdout("UU 1.txt\n");
    run_twig_command(dir, &["commit", "-m", "too early"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("1.txt"));

    write_file(dir, "1.txt", "main and topic\n");
    run_twig_command(dir, &["add", "1.txt"]).assert().success();
    run_twig_command(dir, &["commit"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("] Merge branch 'topic'\n"));

    assert_eq!(head_subjects(dir)[0], "Merge branch 'topic'");
    run_twig_command(dir, &["log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merge: "));
}

#[rstest]
fn merge_abort_restores_the_tree(diverged: TempDir) {
    let dir = diverged.path();
    run_twig_command(dir, &["merge", "topic"]).assert().code(1);

    run_twig_command(dir, &["merge", "--abort"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("HEAD is now at "));

    assert_eq!(read_file(dir, "1.txt"), "main\n");
    run_twig_command(dir, &["status", "--porcelain"])
        .assert()
        .success()
        .stdout("");
}

#[rstest]
fn rebase_continue_after_resolving(diverged: TempDir) {
    let dir = diverged.path();
    run_twig_command(dir, &["checkout", "topic"]).assert().success();

    run_twig_command(dir, &["rebase", "main"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Could not apply pick "))
        .stdout(predicate::str::contains("Topic edit"));
    diverged
        .child(".twig/REBASE_STATE")
        .assert(predicate::path::is_file());

    write_file(dir, "1.txt", "rebased\n");
    run_twig_command(dir, &["add", "1.txt"]).assert().success();
    run_twig_command(dir, &["rebase", "--continue"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Successfully rebased, now at "));

    diverged
        .child(".twig/REBASE_STATE")
        .assert(predicate::path::missing());
    assert_eq!(head_subjects(dir), vec!["Topic edit", "Main edit", "Initial commit"]);
    assert_eq!(read_file(dir, "1.txt"), "rebased\n");
}

#[rstest]
fn rebase_abort_goes_back(diverged: TempDir) {
    let dir = diverged.path();
    run_twig_command(dir, &["checkout", "topic"]).assert().success();
    run_twig_command(dir, &["rebase", "main"]).assert().code(1);

    run_twig_command(dir, &["rebase", "--abort"]).assert().success();

    diverged
        .child(".twig/REBASE_STATE")
        .assert(predicate::path::missing());
    assert_eq!(read_file(dir, "1.txt"), "topic\n");
    assert_eq!(head_subjects(dir), vec!["Topic edit", "Initial commit"]);
    run_twig_command(dir, &["status"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("On branch topic\n"));
}

#[rstest]
fn rebase_follows_a_todo_file(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_twig_command(dir, &["branch", "base"]).assert().success();
    commit_change(dir, "x.txt", "x\n", "Add x");
    commit_change(dir, "y.txt", "y\n", "Add y");
    commit_change(dir, "z.txt", "z\n", "Add z");

    let plan = run_twig_command(dir, &["rebase", "base", "--show-todo"])
        .output()
        .unwrap();
    let plan = String::from_utf8(plan.stdout).unwrap();
    assert_eq!(plan.lines().count(), 3);
    assert!(plan.lines().all(|line| line.starts_with("pick ")));

    let edited = plan
        .lines()
        .enumerate()
        .map(|(position, line)| match position {
            1 => line.replacen("pick", "fixup", 1),
            2 => line.replacen("pick", "drop", 1),
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    write_file(dir, "todo.txt", &edited);

    run_twig_command(dir, &["rebase", "base", "--todo", "todo.txt"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Successfully rebased"));

    assert_eq!(head_subjects(dir), vec!["Add x", "Initial commit"]);
    assert!(dir.join("y.txt").exists());
    assert!(!dir.join("z.txt").exists());
}
