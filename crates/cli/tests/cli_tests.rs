//! CLI integration tests

use std::io::Write;
use std::process::Command;

fn fcast(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "fcast-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = fcast(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("cAdvisor Forecaster"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("query"), "Should show query command");
    assert!(stdout.contains("metrics"), "Should show metrics command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = fcast(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("fcast"), "Should show binary name");
}

#[test]
fn test_query_help() {
    let output = fcast(&["query", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Query help should succeed");
    assert!(stdout.contains("--metric"), "Should show metric option");
    assert!(stdout.contains("--push"), "Should show push option");
    assert!(stdout.contains("--lookback"), "Should show lookback option");
}

#[test]
fn test_metrics_list_json() {
    let output = fcast(&["metrics", "list", "--format", "json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Metrics list should succeed");
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 15);
    assert_eq!(rows[0]["name"], "container_cpu_usage_seconds_total");
}

#[test]
fn test_predict_file_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"metric": {{"pod": "web-0"}}, "values": [[1700000000, "3"], [1700000060, "3"], [1700000120, "3"]]}},
            {{"metric": {{"pod": "web-1"}}, "values": [[1700000000, "8"]]}}]"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap();
    let output = fcast(&["predict", "--file", path, "--format", "json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict should succeed");
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows[0]["outcome"], "modeled");
    assert!((rows[0]["value"].as_f64().unwrap() - 3.0).abs() < 1e-6);
    assert_eq!(rows[1]["outcome"], "insufficient_rows");
    assert_eq!(rows[1]["value"], 0.5);
}

#[test]
fn test_predict_rejects_unknown_model() {
    let output = fcast(&["--model", "arima", "metrics", "list"]);
    assert!(!output.status.success(), "Unknown model should fail");
}
