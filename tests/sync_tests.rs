mod common;

use common::{Sandbox, batch};
use predicates::prelude::*;
use std::fs;

#[test]
fn test_sync_creates_then_modifies() {
    let sandbox = Sandbox::new();

    let first = sandbox.sync_json(&batch(&[("a/b.txt", "hello")]));
    assert_eq!(first["success"], true);
    assert_eq!(first["results"][0]["path"], "a/b.txt");
    assert_eq!(first["results"][0]["status"], "CREATED");
    assert_eq!(sandbox.read("a/b.txt"), "hello");

    let second = sandbox.sync_json(&batch(&[("a/b.txt", "world")]));
    assert_eq!(second["results"][0]["status"], "MODIFIED");
    assert_eq!(sandbox.read("a/b.txt"), "world");

    assert_eq!(sandbox.transactions().len(), 2);
}

#[test]
fn test_sync_maps_virtual_prefixes() {
    let sandbox = Sandbox::new();

    let response = sandbox.sync_json(&batch(&[
        ("res://scenes/main.gd", "extends Node"),
        ("user://save.cfg", "[save]"),
        ("file://notes.md", "# notes"),
    ]));

    let paths: Vec<_> = response["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, ["scenes/main.gd", "user_data/save.cfg", "notes.md"]);
    assert_eq!(sandbox.read("scenes/main.gd"), "extends Node");
    assert_eq!(sandbox.read("user_data/save.cfg"), "[save]");
    assert_eq!(sandbox.read("notes.md"), "# notes");
}

#[test]
fn test_sync_partial_failure_keeps_going() {
    let sandbox = Sandbox::new();

    let response = sandbox.sync_json(&batch(&[
        ("a.txt", "1"),
        ("../../escape.txt", "x"),
        ("b.txt", "2"),
    ]));

    let statuses: Vec<_> = response["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, ["CREATED", "ERROR", "CREATED"]);
    assert!(
        response["results"][1]["error"]
            .as_str()
            .unwrap()
            .contains("Security Violation")
    );
    assert!(!sandbox.outside().join("escape.txt").exists());
    assert_eq!(sandbox.read("a.txt"), "1");
    assert_eq!(sandbox.read("b.txt"), "2");
}

#[test]
fn test_sync_from_file_accepts_bare_array() {
    let sandbox = Sandbox::new();
    let input = sandbox.outside().join("batch.json");
    fs::write(&input, r#"[{"path": "x.txt", "content": "from file"}]"#).unwrap();

    sandbox
        .cmd()
        .arg("sync")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATED"))
        .stdout(predicate::str::contains("x.txt"));

    assert_eq!(sandbox.read("x.txt"), "from file");
}

#[test]
fn test_sync_rejects_malformed_batch() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("sync")
        .write_stdin("{ not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    assert!(sandbox.transactions().is_empty());
}

#[test]
fn test_sync_cannot_write_into_bookkeeping_dir() {
    let sandbox = Sandbox::new();
    sandbox.sync_json(&batch(&[("a.txt", "1")]));

    let response = sandbox.sync_json(&batch(&[(".ai-bridge/transactions/evil", "x")]));

    assert_eq!(response["results"][0]["status"], "ERROR");
    assert_eq!(sandbox.transactions().len(), 2);
}

#[test]
fn test_retention_flag_bounds_history() {
    let sandbox = Sandbox::new();

    for i in 0..6 {
        sandbox
            .cmd()
            .args(["sync", "-", "--retention", "3"])
            .write_stdin(batch(&[("f.txt", &format!("v{i}"))]).to_string())
            .assert()
            .success();
    }

    assert_eq!(sandbox.transactions().len(), 3);
    assert_eq!(sandbox.read("f.txt"), "v5");
}
