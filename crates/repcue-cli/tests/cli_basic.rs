//! Basic CLI E2E tests.
//!
//! Each test runs the `repcue` binary against its own temporary data
//! directory and checks the JSON it prints.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    run_cli_with_input(data_dir, args, "")
}

fn run_cli_with_input(data_dir: &Path, args: &[&str], input: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_repcue"))
        .args(args)
        .env("REPCUE_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).unwrap();
    }
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("not JSON ({e}): {stdout}"))
}

#[test]
fn test_session_preview_default_workout() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["session", "preview"]);
    assert_eq!(code, 0);

    let plan = json(&stdout);
    assert_eq!(plan["name"], "Beginner Workout");
    assert_eq!(plan["exercises"].as_array().unwrap().len(), 5);
    assert_eq!(plan["total_secs"], 215);
    assert_eq!(plan["total"], "3m 35s");
    assert_eq!(plan["estimated_minutes"], 4);
}

#[test]
fn test_session_preview_workout_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("cardio.toml");
    std::fs::write(
        &file,
        r#"
id = 7
name = "Cardio Blast"
exercise_duration_secs = 30
rest_duration_secs = 15

[[exercises]]
exercise_key = "high-knees"

[[exercises]]
exercise_key = "burpees"
duration_secs = 20
"#,
    )
    .unwrap();

    let (stdout, _, code) = run_cli(
        dir.path(),
        &["session", "preview", "--workout", file.to_str().unwrap()],
    );
    assert_eq!(code, 0);
    let plan = json(&stdout);
    assert_eq!(plan["total_secs"], 65);
    assert_eq!(plan["exercises"][0]["name"], "High Knees");
    assert_eq!(plan["exercises"][1]["duration_secs"], 20);
}

#[test]
fn test_session_preview_rejects_empty_workout() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("empty.toml");
    std::fs::write(&file, "id = 1\nname = \"Nothing\"\nexercises = []\n").unwrap();

    let (_, stderr, code) = run_cli(
        dir.path(),
        &["session", "preview", "--workout", file.to_str().unwrap()],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_session_run_stop_records_incomplete() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli_with_input(
        dir.path(),
        &["session", "run", "--no-get-ready"],
        "q\n",
    );
    assert_eq!(code, 0);

    let events: Vec<serde_json::Value> = stdout.lines().map(json).collect();
    assert_eq!(events.first().unwrap()["type"], "state_snapshot");
    assert_eq!(events[1]["type"], "session_started");
    let last = events.last().unwrap();
    assert_eq!(last["type"], "workout_abandoned");
    assert_eq!(last["record"]["status"], "incomplete");

    let (stdout, _, code) = run_cli(dir.path(), &["history", "list"]);
    assert_eq!(code, 0);
    let history = json(&stdout);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["workout_name"], "Beginner Workout");
    assert_eq!(history[0]["status"], "incomplete");
}

#[test]
fn test_reminder_add_list_cancel() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(
        dir.path(),
        &[
            "reminder",
            "add-workout",
            "--workout-id",
            "3",
            "--name",
            "Leg Day",
            "--at",
            "2099-01-01T07:00:00Z",
            "--daily",
        ],
    );
    assert_eq!(code, 0);
    let reminder = json(&stdout);
    assert_eq!(reminder["id"], "workout-3");
    assert_eq!(reminder["recurring"], "daily");

    let (stdout, _, _) = run_cli(
        dir.path(),
        &["reminder", "add-nutrition", "--at", "2099-01-01T12:00:00Z"],
    );
    assert_eq!(json(&stdout)["message"], "Time to log your meal!");

    let (stdout, _, _) = run_cli(dir.path(), &["reminder", "list"]);
    let pending = json(&stdout);
    assert_eq!(pending.as_array().unwrap().len(), 2);
    assert_eq!(pending[0]["id"], "workout-3");

    let (stdout, _, code) = run_cli(dir.path(), &["reminder", "cancel-workout", "3"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["removed"], 1);

    let (stdout, _, _) = run_cli(dir.path(), &["reminder", "cancel-workout", "3"]);
    assert_eq!(json(&stdout)["removed"], 0);

    let (stdout, _, _) = run_cli(dir.path(), &["reminder", "list"]);
    assert_eq!(json(&stdout).as_array().unwrap().len(), 1);
}

#[test]
fn test_reminder_in_past_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["reminder", "add-nutrition", "--at", "2001-01-01T12:00:00Z"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("past"));
}

#[test]
fn test_disabling_reminders_cancels_pending() {
    let dir = TempDir::new().unwrap();
    for id in ["1", "2"] {
        let (_, _, code) = run_cli(
            dir.path(),
            &[
                "reminder",
                "add-workout",
                "--workout-id",
                id,
                "--name",
                "Morning",
                "--at",
                "2099-01-01T07:00:00Z",
            ],
        );
        assert_eq!(code, 0);
    }

    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "reminders.enabled", "false"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("cancelled 2"));

    let (stdout, _, _) = run_cli(dir.path(), &["reminder", "list"]);
    assert!(json(&stdout).as_array().unwrap().is_empty());

    let (_, stderr, code) = run_cli(
        dir.path(),
        &["reminder", "add-nutrition", "--at", "2099-01-01T12:00:00Z"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "session.rest_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "15");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "session.rest_secs", "20"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "session.rest_secs"]);
    assert_eq!(stdout.trim(), "20");

    let (stdout, _, _) = run_cli(dir.path(), &["session", "preview"]);
    assert_eq!(json(&stdout)["rest_secs"], 20);

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_history_stats_empty() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["history", "stats", "--days", "30"]);
    assert_eq!(code, 0);
    let stats = json(&stdout);
    assert_eq!(stats["workouts"], 0);
    assert_eq!(stats["calories"], 0);

    let (stdout, _, code) = run_cli(dir.path(), &["history", "reset"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["deleted"], 0);
}

#[test]
fn test_history_stats_huge_window() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli_with_input(
        dir.path(),
        &["session", "run", "--no-get-ready"],
        "q\n",
    );
    assert_eq!(code, 0);

    let (stdout, stderr, code) =
        run_cli(dir.path(), &["history", "stats", "--days", "4294967295"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let stats = json(&stdout);
    assert_eq!(stats["workouts"], 1);
    assert_eq!(stats["completed"], 0);
}

#[test]
fn test_session_run_rejects_zero_length_exercise() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("broken.toml");
    std::fs::write(
        &file,
        r#"
id = 2
name = "Broken"

[[exercises]]
exercise_key = "plank"
duration_secs = 0
"#,
    )
    .unwrap();

    let (stdout, stderr, code) = run_cli(
        dir.path(),
        &["session", "run", "--no-get-ready", "--workout", file.to_str().unwrap()],
    );
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("at least one second"));

    let (stdout, _, _) = run_cli(dir.path(), &["history", "list"]);
    assert!(json(&stdout).as_array().unwrap().is_empty());
}
