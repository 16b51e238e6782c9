//! CLI integration tests
//!
//! Runs the changebench binary end to end.

use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn changebench() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_changebench"));
    for (key, _) in std::env::vars() {
        if key.starts_with("CHANGEBENCH_") {
            command.env_remove(key);
        }
    }
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn test_help_lists_subcommands() {
    let output = changebench()
        .arg("--help")
        .output()
        .expect("Failed to execute changebench");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("consume"), "help should list 'consume'");
    assert!(stdout.contains("produce"), "help should list 'produce'");
}

#[test]
fn test_missing_batch_size_fails() {
    let output = changebench()
        .args(["consume", "--full-document", "default"])
        .output()
        .expect("Failed to execute changebench");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("batch size is required"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_full_document_mode_fails() {
    let output = changebench()
        .args(["consume", "--full-document", "always", "--batch-size", "5"])
        .output()
        .expect("Failed to execute changebench");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_produce_then_consume_from_file() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("bench.db");
    let feed = dir.path().join("feed.ndjson");

    let produced = changebench()
        .args(["produce", "--documents", "10", "--updates", "25", "--store"])
        .arg(&store)
        .arg("--out")
        .arg(&feed)
        .output()
        .expect("Failed to execute changebench");
    assert!(
        produced.status.success(),
        "{}",
        String::from_utf8_lossy(&produced.stderr)
    );

    for mode in ["default", "updateLookup"] {
        let consumed = changebench()
            .args(["consume", "--full-document", mode, "--batch-size", "10", "--store"])
            .arg(&store)
            .arg("--feed")
            .arg(&feed)
            .output()
            .expect("Failed to execute changebench");

        assert!(
            consumed.status.success(),
            "{}",
            String::from_utf8_lossy(&consumed.stderr)
        );
        let stdout = String::from_utf8_lossy(&consumed.stdout);
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.first(), Some(&"=== changebench report start ==="));
        assert_eq!(lines.last(), Some(&"=== changebench report end ==="));
        assert!(stdout.contains(&format!("fullDocument={} batchSize=10", mode)));
        assert!(stdout.contains("processed events: 25"));
        assert!(stdout.contains("batches: 3 (failed: 0)"));
    }
}

#[test]
fn test_config_file_supplies_parameters() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("feed.ndjson");
    std::fs::write(
        &feed,
        concat!(
            r#"{"operationType":"insert","documentKey":"a","fullDocument":{"v":0}}"#,
            "\n",
            r#"{"operationType":"update","documentKey":"a","fullDocument":{"v":1}}"#,
            "\n",
        ),
    )
    .unwrap();

    let config = dir.path().join("changebench.toml");
    std::fs::write(
        &config,
        format!(
            "[consume]\nfull_document = \"updateLookup\"\nbatch_size = 4\nfeed = {:?}\n",
            feed.to_str().unwrap()
        ),
    )
    .unwrap();

    let output = changebench()
        .arg("--config")
        .arg(&config)
        .arg("consume")
        .output()
        .expect("Failed to execute changebench");

    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("batchSize=4"));
    assert!(stdout.contains("processed events: 1"));
}

#[test]
fn test_feed_without_measured_events_fails() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("feed.ndjson");
    std::fs::write(
        &feed,
        r#"{"operationType":"insert","documentKey":"a"}"#.to_string() + "\n",
    )
    .unwrap();

    let output = changebench()
        .args(["consume", "--full-document", "updateLookup", "--batch-size", "2", "--feed"])
        .arg(&feed)
        .output()
        .expect("Failed to execute changebench");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "no report on failure");
}

#[test]
fn test_seeding_timeout_exit_status() {
    let mut child = changebench()
        .args([
            "consume",
            "--full-document",
            "updateLookup",
            "--batch-size",
            "2",
            "--seeding-timeout-secs",
            "1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to execute changebench");

    // Keep stdin open so only the seeding deadline can end the run.
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, r#"{{"operationType":"insert","documentKey":"a"}}"#).unwrap();
    stdin.flush().unwrap();

    let status = child.wait().unwrap();
    drop(stdin);

    assert_eq!(status.code(), Some(2));
}
