use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::{json, Value};

fn bin(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("soul-episodes").unwrap();
    cmd.current_dir(dir)
        .env_remove("SOUL_DATASET")
        .env_remove("SOUL_DATASETS_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn write_dataset(root: &Path) {
    let dataset = root.join("datasets/shop");
    fs::create_dir_all(&dataset).unwrap();
    fs::write(
        dataset.join("dataset.yaml"),
        "system_prompt: You are a shopping agent.\ntool_description: TOOLS\nweb: true\n",
    )
    .unwrap();
}

fn episodes() -> String {
    let good = json!({
        "id": "good",
        "steps": [
            {"type": "text_observation", "content": "buy shoes", "source": "user"},
            {"type": "api_action", "function": "click", "arguments": {"bid": "12"}}
        ]
    });
    let bad = json!({
        "id": "bad",
        "steps": [
            {"type": "text_observation", "content": "buy shoes", "source": "user"},
            {"type": "api_action", "function": "click", "arguments": {"bid": "12", "force": true}}
        ]
    });
    format!("{good}\nnot json\n{bad}\n")
}

#[test]
fn schema_describes_episode() {
    let dir = tempfile::tempdir().unwrap();
    let output = bin(dir.path()).arg("schema").assert().success().get_output().stdout.clone();
    let schema: Value = serde_json::from_slice(&output).unwrap();
    assert!(schema["properties"]["steps"].is_object());
}

#[test]
fn validate_reports_unknown_tags_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("episodes.jsonl");
    let unknown = json!({"id": "x", "steps": [{"type": "scroll_observation"}]});
    fs::write(&input, format!("{unknown}\n")).unwrap();

    let assert = bin(dir.path())
        .args(["validate", "--input"])
        .arg(&input)
        .assert()
        .failure();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("line 1: episode 'x'"));
    assert!(stdout.contains("scroll_observation"));
    assert!(stdout.contains("0 valid, 1 invalid, 0 malformed"));
}

#[test]
fn render_requires_dataset_selection() {
    let dir = tempfile::tempdir().unwrap();
    let assert = bin(dir.path()).arg("render").write_stdin("").assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("SOUL_DATASET"));
}

#[test]
fn render_writes_records_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());

    let assert = bin(dir.path())
        .env("SOUL_DATASET", "shop")
        .args(["render", "--workers", "2"])
        .write_stdin(episodes())
        .assert()
        .success();
    let output = assert.get_output();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let records: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "good");
    assert_eq!(records[0]["system"], "You are a shopping agent.");
    assert_eq!(records[0]["conversations"][0]["value"], "TOOLS\n\nbuy shoes");
    assert_eq!(
        records[0]["conversations"][1]["value"],
        "<function=browser>\n<parameter=code>click(bid=\"12\")</parameter>\n</function>"
    );

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    assert!(stderr.contains("rendered=1 skipped=1 failed=1 resolver_misses=0"));
}
