//! End-to-end scenarios exercising the public `Repository` façade, the diff
//! strategies, the merge engine, and dangling-commit recovery together.

use linage::diff::DiffStrategyKind;
use linage::merge::MergeEngine;
use linage::Repository;

#[tokio::test]
async fn initial_commit_creates_one_blob_and_one_history_entry() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();

    let mut repo = Repository::init(dir.path()).await.unwrap();
    let commit = repo.commit("init", "Ada", "ada@example.com").await.unwrap();

    assert_eq!(commit.snapshot.files.len(), 1);
    assert_eq!(commit.snapshot.files[0].path, "README.md");

    let history = repo.log().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].digest, commit.digest);
}

#[test]
fn myers_diff_round_trips_single_line_substitution() {
    let old: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let new: Vec<String> = ["a", "x", "c"].iter().map(|s| s.to_string()).collect();

    let opcodes = DiffStrategyKind::Myers.compute(&old, &new);
    let rebuilt = linage::diff::reconstruct(&old, &new, &opcodes);
    assert_eq!(rebuilt, new);

    let touched_old: Vec<_> = opcodes.iter().filter(|op| !op.is_equal()).map(|op| op.old_range()).collect();
    assert!(touched_old.iter().any(|r| r.contains(&1)), "expected the middle line to be touched");
}

#[test]
fn clean_three_way_merge_combines_disjoint_edits() {
    let engine = MergeEngine::new(DiffStrategyKind::Myers);
    let base = "A\nB\nC\n";
    let local = "A-mod\nB\nC\n";
    let remote = "A\nB\nC-mod\n";

    let result = engine.merge("file.txt", base, local, remote);
    assert!(result.success);
    assert!(result.conflicts.is_empty());
    assert_eq!(result.merged_text, "A-mod\nB\nC-mod\n");
}

#[test]
fn conflicting_merge_emits_marker_block() {
    let engine = MergeEngine::new(DiffStrategyKind::Myers);
    let result = engine.merge("file.txt", "A\n", "A-local\n", "A-remote\n");

    assert!(!result.success);
    assert_eq!(result.conflicts.len(), 1);
    assert!(result.merged_text.contains("<<<<<<< LOCAL"));
    assert!(result.merged_text.contains("======="));
    assert!(result.merged_text.contains(">>>>>>> REMOTE"));
}

#[tokio::test]
async fn dangling_commits_are_found_and_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(dir.path()).await.unwrap();

    repo.create_branch("dev").await.unwrap();
    repo.switch_branch("dev").await.unwrap();
    std::fs::write(dir.path().join("a.txt"), "one\n").unwrap();
    let c1 = repo.commit("c1", "Ada", "ada@example.com").await.unwrap();
    std::fs::write(dir.path().join("b.txt"), "two\n").unwrap();
    let c2 = repo.commit("c2", "Ada", "ada@example.com").await.unwrap();

    // `main` never advanced past its empty root, so deleting `dev` leaves
    // c1/c2 unreachable from every remaining branch head.
    repo.switch_branch("main").await.unwrap();
    repo.delete_branch("dev").await.unwrap();

    let dangling_ids: std::collections::HashSet<_> = repo.find_dangling().iter().map(|c| c.id).collect();
    assert!(dangling_ids.contains(&c1.id));
    assert!(dangling_ids.contains(&c2.id));

    let rescued = repo.recover(c2.id, "rescue").await.unwrap();
    assert_eq!(rescued.head, Some(c2.digest.clone()));
    assert!(!rescued.is_active);
}

#[tokio::test]
async fn rebase_preserves_message_order_and_replays_first_parent_chain() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(dir.path()).await.unwrap();

    std::fs::write(dir.path().join("root.txt"), "root\n").unwrap();
    let m1 = repo.commit("m1", "Ada", "ada@example.com").await.unwrap();

    repo.create_branch("feature").await.unwrap();
    repo.switch_branch("feature").await.unwrap();
    std::fs::write(dir.path().join("f1.txt"), "f1\n").unwrap();
    let f1 = repo.commit("f1", "Ada", "ada@example.com").await.unwrap();
    std::fs::write(dir.path().join("f2.txt"), "f2\n").unwrap();
    repo.commit("f2", "Ada", "ada@example.com").await.unwrap();

    repo.switch_branch("main").await.unwrap();
    std::fs::write(dir.path().join("m2.txt"), "m2\n").unwrap();
    let m2 = repo.commit("m2", "Ada", "ada@example.com").await.unwrap();

    repo.switch_branch("feature").await.unwrap();
    repo.rebase(m2.id).await.unwrap();

    let history = repo.log().unwrap();
    let messages: Vec<String> = {
        let mut by_time = history.clone();
        by_time.sort_by_key(|c| c.timestamp);
        by_time.iter().map(|c| c.message.clone()).collect()
    };
    assert_eq!(messages, vec!["m1", "m2", "f1", "f2"]);

    let rebased_f1 = history.iter().find(|c| c.message == "f1").unwrap();
    assert_ne!(rebased_f1.digest, f1.digest, "replayed commit must get a fresh digest");
}
