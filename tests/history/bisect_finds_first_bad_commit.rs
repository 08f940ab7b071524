use crate::common::sandbox::{Sandbox, sandbox};
use pretty_assertions::assert_eq;
use rstest::rstest;
use twig::artifacts::log::bisect::BisectStep;
use twig::artifacts::objects::object_id::ObjectId;

/// Twenty commits of `calc.txt`; commit #12 flips `a+b` to `a-b` and it stays flipped
#[rstest]
#[tokio::test]
async fn bisect_converges_on_the_commit_that_flipped_the_operator(sandbox: Sandbox) {
    let mut commits = Vec::new();
    for n in 1..=20 {
        let operator = if n >= 12 { "a-b" } else { "a+b" };
        let content = format!("result = {operator}\nrevision = {n}\n");
        commits.push(
            sandbox
                .commit_files(&[("calc.txt", content.as_str())], &format!("commit {n}"))
                .await,
        );
    }
    let is_bad = |oid: &ObjectId| {
        let listing = sandbox.repository.database().tree_listing(Some(oid)).unwrap();
        let blob = sandbox
            .repository
            .database()
            .load_blob(&listing[std::path::Path::new("calc.txt")].oid)
            .unwrap();
        String::from_utf8_lossy(blob.content()).contains("a-b")
    };

    let first = commits[0].to_string();
    let (mut session, mut step) = sandbox.repository.bisect_start("HEAD", &[first.as_str()]).unwrap();
    let found = loop {
        match step {
            BisectStep::Done(found) => break found,
            BisectStep::Test(candidate) => {
                let good = !is_bad(&candidate);
                step = sandbox
                    .repository
                    .bisect_mark(&mut session, &candidate.to_string(), good)
                    .unwrap();
            }
        }
    };

    assert_eq!(found, commits[11]);
    // ⌈log2(20)⌉
    assert!(session.steps() <= 5, "took {} steps", session.steps());
}
