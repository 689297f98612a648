//! E2E CLI tests covering:
//! - `dk init` and the not-initialized error contract
//! - filing, state changes, revisions and history
//! - the ballot workflow from issue to approval
//! - last call request and send
//! - undo of a state change
//!
//! Each test runs `dk` as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const ROSTER_CONFIG: &str = r#"
[telechat]
dates = ["2099-01-08", "2099-01-22"]

[[roster.members]]
id = "ad1"
name = "Ada One"

[[roster.members]]
id = "ad2"
name = "Bo Two"

[[roster.members]]
id = "ad3"
name = "Cy Three"
"#;

/// Build a Command targeting the `dk` binary, rooted in `dir`.
fn dk_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dk"));
    cmd.current_dir(dir);
    cmd.env("DOCKET_ACTOR", "ad1");
    cmd.env("DOCKET_LOG", "error");
    cmd.env("DOCKET_FORMAT", "text");
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env("HOME", dir);
    cmd
}

/// `dk init`, then replace the starter config with a three-member roster
/// and two telechats.
fn init_project(dir: &Path) {
    dk_cmd(dir).arg("init").assert().success();
    std::fs::write(dir.join(".docket/config.toml"), ROSTER_CONFIG).expect("write config");
}

fn json(dir: &Path, args: &[&str]) -> Value {
    let output = dk_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("dk should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

fn file_draft(dir: &Path, name: &str) {
    dk_cmd(dir)
        .args([
            "file",
            name,
            "--title",
            "A Protocol",
            "--group",
            "wg1",
            "--group-kind",
            "wg",
            "--intended",
            "inf",
            "--ad",
            "ad1",
            "--state",
            "draft-iesg=ad-eval",
        ])
        .assert()
        .success();
}

/// Slug of `state_type` from `dk show --json`.
fn state_of(dir: &Path, name: &str, state_type: &str) -> Option<String> {
    let shown = json(dir, &["show", name]);
    shown["states"]
        .as_array()
        .expect("states array")
        .iter()
        .find(|s| s["state_type"] == state_type)
        .and_then(|s| s["slug"].as_str())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Setup and errors
// ---------------------------------------------------------------------------

#[test]
fn commands_outside_a_project_report_not_initialized() {
    let dir = TempDir::new().expect("temp dir");
    dk_cmd(dir.path())
        .args(["show", "draft-x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"));
}

#[test]
fn init_twice_needs_force() {
    let dir = TempDir::new().expect("temp dir");
    dk_cmd(dir.path()).arg("init").assert().success();
    dk_cmd(dir.path()).arg("init").assert().failure();
    dk_cmd(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn unknown_document_is_a_coded_json_error() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    let output = dk_cmd(dir.path())
        .args(["show", "draft-missing", "--json"])
        .output()
        .expect("dk should not crash");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error on stderr");
    assert_eq!(err["error"]["error_code"], "E2001");
}

#[test]
fn mutations_need_an_actor() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    dk_cmd(dir.path())
        .env_remove("DOCKET_ACTOR")
        .env_remove("USER")
        .args(["file", "draft-ietf-wg1-proto", "--title", "A Protocol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_actor"));
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[test]
fn filed_draft_shows_its_states() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    file_draft(dir.path(), "draft-ietf-wg1-proto");

    assert_eq!(
        state_of(dir.path(), "draft-ietf-wg1-proto", "draft-iesg").as_deref(),
        Some("ad-eval")
    );
    assert_eq!(
        state_of(dir.path(), "draft-ietf-wg1-proto", "draft").as_deref(),
        Some("active")
    );

    let listed = json(dir.path(), &["list"]);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    dk_cmd(dir.path())
        .args(["file", "draft-ietf-wg1-proto", "--title", "Again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));
}

#[test]
fn past_revision_is_still_readable() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    file_draft(dir.path(), "draft-ietf-wg1-proto");
    dk_cmd(dir.path())
        .args(["revise", "draft-ietf-wg1-proto", "01"])
        .assert()
        .success();

    let now = json(dir.path(), &["show", "draft-ietf-wg1-proto"]);
    assert_eq!(now["rev"], "01");

    let then = json(dir.path(), &["history", "draft-ietf-wg1-proto", "--rev", "00"]);
    assert_eq!(then["rev"], "00");

    let snapshots = json(dir.path(), &["history", "draft-ietf-wg1-proto"]);
    assert!(!snapshots.as_array().expect("snapshot array").is_empty());
}

#[test]
fn state_change_can_be_undone() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    file_draft(dir.path(), "draft-ietf-wg1-proto");

    let events = json(
        dir.path(),
        &["state", "draft-ietf-wg1-proto", "draft-iesg", "writeupw", "-m", "ready"],
    );
    let changed = events
        .as_array()
        .expect("event array")
        .iter()
        .find(|e| e["event_type"] == "changed_state")
        .expect("a state change event")["id"]
        .as_i64()
        .expect("event id");
    assert_eq!(
        state_of(dir.path(), "draft-ietf-wg1-proto", "draft-iesg").as_deref(),
        Some("writeupw")
    );

    dk_cmd(dir.path())
        .args(["undo", &changed.to_string()])
        .assert()
        .success();
    assert_eq!(
        state_of(dir.path(), "draft-ietf-wg1-proto", "draft-iesg").as_deref(),
        Some("ad-eval")
    );
}

// ---------------------------------------------------------------------------
// IESG workflows
// ---------------------------------------------------------------------------

#[test]
fn ballot_runs_from_issue_to_announcement() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    file_draft(dir.path(), "draft-ietf-wg1-proto");

    dk_cmd(dir.path())
        .args(["ballot", "issue", "draft-ietf-wg1-proto"])
        .assert()
        .success();
    assert_eq!(
        state_of(dir.path(), "draft-ietf-wg1-proto", "draft-iesg").as_deref(),
        Some("iesg-eva")
    );

    // A discuss needs text.
    dk_cmd(dir.path())
        .args(["--actor", "ad2", "ballot", "position", "draft-ietf-wg1-proto", "discuss"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3003"));
    dk_cmd(dir.path())
        .args([
            "--actor",
            "ad2",
            "ballot",
            "position",
            "draft-ietf-wg1-proto",
            "discuss",
            "--discuss",
            "Section 3 is unclear.",
        ])
        .assert()
        .success();

    let tally = json(dir.path(), &["ballot", "tally", "draft-ietf-wg1-proto"]);
    let active = tally["active"].as_array().expect("active positions");
    assert_eq!(active.len(), 3);
    let pos_of = |id: &str| {
        active
            .iter()
            .find(|p| p["balloter"] == id)
            .and_then(|p| p["pos"].as_str())
            .map(str::to_string)
    };
    assert_eq!(pos_of("ad1").as_deref(), Some("yes"));
    assert_eq!(pos_of("ad2").as_deref(), Some("discuss"));
    assert_eq!(pos_of("ad3").as_deref(), Some("norecord"));

    dk_cmd(dir.path())
        .args(["ballot", "position", "draft-ietf-wg1-proto", "noobj", "--balloter", "ad2"])
        .assert()
        .success();
    dk_cmd(dir.path())
        .args(["ballot", "approve", "draft-ietf-wg1-proto"])
        .assert()
        .success();
    assert_eq!(
        state_of(dir.path(), "draft-ietf-wg1-proto", "draft-iesg").as_deref(),
        Some("ann")
    );

    let ballots = json(dir.path(), &["ballot", "list", "draft-ietf-wg1-proto"]);
    assert!(ballots[0]["closed_at"].is_string());
}

#[test]
fn last_call_goes_out_and_is_not_yet_expired() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    file_draft(dir.path(), "draft-ietf-wg1-proto");

    dk_cmd(dir.path())
        .args(["last-call", "request", "draft-ietf-wg1-proto"])
        .assert()
        .success();
    assert_eq!(
        state_of(dir.path(), "draft-ietf-wg1-proto", "draft-iesg").as_deref(),
        Some("lc-req")
    );
    dk_cmd(dir.path())
        .args(["last-call", "request", "draft-ietf-wg1-proto"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4002"));

    dk_cmd(dir.path())
        .args(["last-call", "send", "draft-ietf-wg1-proto"])
        .assert()
        .success();
    let shown = json(dir.path(), &["show", "draft-ietf-wg1-proto"]);
    assert!(shown["last_call_expires"].is_string());

    let expired = json(dir.path(), &["last-call", "expired"]);
    assert_eq!(expired, Value::Array(Vec::new()));

    let report = json(dir.path(), &["last-call", "sweep"]);
    assert_eq!(report["expired"], Value::Array(Vec::new()));
}

#[test]
fn telechat_calendar_lists_configured_dates() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    dk_cmd(dir.path())
        .args(["telechat", "add", "2099-02-05"])
        .assert()
        .success();

    let dates = json(dir.path(), &["telechat", "list"]);
    assert_eq!(
        dates,
        serde_json::json!(["2099-01-08", "2099-01-22", "2099-02-05"])
    );

    file_draft(dir.path(), "draft-ietf-wg1-proto");
    dk_cmd(dir.path())
        .args(["telechat", "schedule", "draft-ietf-wg1-proto", "2099-03-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4004"));
    dk_cmd(dir.path())
        .args(["telechat", "schedule", "draft-ietf-wg1-proto", "2099-01-22"])
        .assert()
        .success();
    let shown = json(dir.path(), &["show", "draft-ietf-wg1-proto"]);
    assert_eq!(shown["telechat"], "2099-01-22");
}

#[test]
fn relations_list_both_directions() {
    let dir = TempDir::new().expect("temp dir");
    init_project(dir.path());
    file_draft(dir.path(), "draft-ietf-wg1-proto");
    file_draft(dir.path(), "draft-ietf-wg1-base");

    dk_cmd(dir.path())
        .args(["relate", "add", "draft-ietf-wg1-proto", "refnorm", "draft-ietf-wg1-base"])
        .assert()
        .success();

    let from = json(dir.path(), &["relate", "list", "draft-ietf-wg1-proto"]);
    assert_eq!(from["outgoing"][0]["target"], "draft-ietf-wg1-base");
    let to = json(dir.path(), &["relate", "list", "draft-ietf-wg1-base"]);
    assert_eq!(to["incoming"][0]["source"], "draft-ietf-wg1-proto");
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().expect("temp dir");
    dk_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dk"));
}
