//! End-to-end runs of the `lodging-matcher` binary against a temporary copy
//! of the demo event.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DEMO: &str = include_str!("../data/demo_event.json");

fn demo_data() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lodging.json");
    std::fs::write(&path, DEMO).unwrap();
    (dir, path)
}

fn cli(data: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lodging-matcher").unwrap();
    cmd.arg("--data").arg(data);
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("lodging-matcher")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("match"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_suggest_hosts_for_visitor() {
    let (_dir, data) = demo_data();
    cli(&data)
        .args(["suggest", "visitor", "pos-000005"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 pos-000005 -> pos-000001  score 100"));
}

#[test]
fn test_suggest_limit_and_tsv() {
    let (_dir, data) = demo_data();
    let output = cli(&data)
        .args(["--format", "tsv", "suggest", "host", "pos-000001", "-n", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("rank\tvisitor\thost"));
    assert!(lines[1].starts_with("1\t"));
}

#[test]
fn test_suggest_unknown_visitor_fails() {
    let (_dir, data) = demo_data();
    cli(&data)
        .args(["suggest", "visitor", "pos-999999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_score_as_json() {
    let (_dir, data) = demo_data();
    let output = cli(&data)
        .args(["--format", "json", "score", "pos-000005", "pos-000001"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["score"]["total"], 100);
    assert_eq!(json["score"]["fit"], "excellent");
    assert!(json["explanation"]["pros"].as_array().unwrap().len() > 3);
}

#[test]
fn test_score_explains_disqualification() {
    let (_dir, data) = demo_data();
    cli(&data)
        .args(["score", "pos-000005", "pos-000002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0/100"))
        .stdout(predicate::str::contains("Disqualified"));
}

#[test]
fn test_match_create_list_cancel_persists() {
    let (_dir, data) = demo_data();

    cli(&data)
        .args(["match", "create", "pos-000005", "pos-000001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created match-000001"));

    // The snapshot on disk now carries the match and the capacity change
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&data).unwrap()).unwrap();
    assert_eq!(saved["matches"].as_array().unwrap().len(), 1);

    cli(&data)
        .args(["match", "list", "--event", "fiesta-2025"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pos-000005 lodged with host pos-000001"));

    cli(&data)
        .args(["postulation", "list", "--event", "fiesta-2025", "--role", "host", "--status", "matched"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/4 places left"));

    cli(&data)
        .args(["match", "cancel", "match-000001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled match-000001"));

    cli(&data)
        .args(["match", "cancel", "match-000001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cancelled"));
}

#[test]
fn test_match_with_pending_visitor_is_refused() {
    let (_dir, data) = demo_data();
    let before = std::fs::read_to_string(&data).unwrap();

    cli(&data)
        .args(["match", "create", "pos-000008", "pos-000001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pending"));

    assert_eq!(std::fs::read_to_string(&data).unwrap(), before);
}

#[test]
fn test_apply_and_review_postulation() {
    let (dir, data) = demo_data();
    let form = dir.path().join("visitor.json");
    std::fs::write(
        &form,
        r#"{"type": "visitor", "people_count": 2, "ages": [41, 39], "gender": "mixed",
            "arrival": "2025-07-06", "departure": "2025-07-09"}"#,
    )
    .unwrap();

    cli(&data)
        .args(["postulation", "apply", "--event", "fiesta-2025", "--requester", "user-100"])
        .arg("--from")
        .arg(&form)
        .assert()
        .success()
        .stdout(predicate::str::contains("Filed pos-000010 [visitor pending]"));

    // Same requester, same role, still live
    cli(&data)
        .args(["postulation", "apply", "--event", "fiesta-2025", "--requester", "user-100"])
        .arg("--from")
        .arg(&form)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already has a live visitor postulation"));

    cli(&data)
        .args(["postulation", "review", "pos-000010", "--status", "approved"])
        .args(["--observation", "documents ok"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[visitor approved]"));

    cli(&data)
        .args(["postulation", "review", "pos-000010", "--status", "matched"])
        .assert()
        .failure();
}

#[test]
fn test_missing_data_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("fresh.json");

    cli(&data)
        .args(["postulation", "list", "--event", "fiesta-2025"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No postulations found."));
}
