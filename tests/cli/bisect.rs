use crate::common::command::{repository_dir, run_twig_command, twig_commit, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::rstest;
use std::path::Path;

/// Full commit IDs printed by `twig log`, oldest first
fn commit_ids(dir: &Path) -> Vec<String> {
    let output = run_twig_command(dir, &["log"]).output().unwrap();
    let mut ids = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("commit "))
        .map(|rest| rest.split_whitespace().next().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    ids.reverse();
    ids
}

#[rstest]
fn bisect_session_persists_between_invocations(repository_dir: TempDir) {
    let dir = repository_dir.path();
    let first_bad = 6;
    for number in 1..=10 {
        let state = if number < first_bad { "ok" } else { "broken" };
        write_file(dir, "state.txt", &format!("{state} {number}\n"));
        run_twig_command(dir, &["add", "state.txt"]).assert().success();
        twig_commit(dir, &format!("Commit {number}")).assert().success();
    }
    let ids = commit_ids(dir);
    assert_eq!(ids.len(), 10);

    let mut output = run_twig_command(dir, &["bisect", "start", "HEAD", &ids[0]])
        .output()
        .unwrap();
    for _ in 0..6 {
        let stdout = String::from_utf8(output.stdout.clone()).unwrap();
        if stdout.contains("is the first bad commit") {
            break;
        }

        let candidate = stdout
            .split_once("test ")
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .unwrap_or_else(|| panic!("unexpected bisect output: {stdout}"))
            .to_string();
        let number = ids.iter().position(|id| *id == candidate).unwrap() + 1;
        let verdict = if number < first_bad { "good" } else { "bad" };

        output = run_twig_command(dir, &["bisect", verdict, &candidate])
            .output()
            .unwrap();
        assert!(output.status.success());
    }

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, format!("{} is the first bad commit\n", ids[first_bad - 1]));

    run_twig_command(dir, &["bisect", "reset"]).assert().success();
    run_twig_command(dir, &["bisect", "good", "HEAD"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("no bisect in progress"));
}
