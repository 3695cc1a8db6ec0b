mod common;

use assert_cmd::Command;
use boar_lookup::{config::LookupConfig, report::AWAITING_INPUT_MESSAGE};
use common::TestWorkspace;
use predicates::{prelude::*, str::contains};

fn boar_lookup() -> Command {
    Command::cargo_bin("boar-lookup").expect("binary exists")
}

#[test]
fn lookup_prints_both_sections() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args(["lookup", "1401", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("== GENETIC PERFORMANCE =="))
        .stdout(contains("== EXTRACTION LOGS =="))
        .stdout(contains("87.5"))
        .stdout(contains("85.0"))
        .stdout(contains("310.5"))
        .stdout(contains("date missing"));
}

#[test]
fn history_lists_recent_extractions_first() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    let output = boar_lookup()
        .args(["history", "1401", "-c", config.to_str().unwrap()])
        .output()
        .expect("run history");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let march = stdout.find("2024-03-20").expect("march row");
    let february = stdout.find("2024-02-14").expect("february row");
    let january = stdout.find("2024-01-05").expect("january row");
    let undated = stdout.find("N/A").expect("undated row");
    assert!(march < february && february < january && january < undated);
    assert!(!stdout.contains("GENETIC PERFORMANCE"));
}

#[test]
fn history_limit_override_caps_rows() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args(["history", "1401", "--limit", "2", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("2024-03-20"))
        .stdout(contains("2024-02-14"))
        .stdout(contains("2024-01-05").not());
}

#[test]
fn history_since_days_excludes_stale_rows() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    // Sample extractions are from early 2024, well outside a one-day window.
    boar_lookup()
        .args(["history", "1401", "--since-days", "1", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("No extraction history found."));
}

#[test]
fn huge_since_days_does_not_crash() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args([
            "history",
            "1401",
            "--since-days",
            "200000000",
            "-c",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("2024-03-20"))
        .stdout(contains("2024-01-05"))
        .stdout(contains("date missing").not());
}

#[test]
fn limit_and_since_days_conflict() {
    boar_lookup()
        .args(["history", "1401", "--limit", "2", "--since-days", "5"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn summary_reports_missing_id() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args(["summary", "9999", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("No match found for ID: 9999"));
}

#[test]
fn exact_match_mode_override_rejects_partial_id() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args([
            "summary",
            "140",
            "--match-mode",
            "exact",
            "-c",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("No match found for ID: 140"));
}

#[test]
fn blank_query_awaits_input() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args(["lookup", "  ", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains(AWAITING_INPUT_MESSAGE))
        .stdout(contains("No match found").not());
}

#[test]
fn summary_json_output_is_structured() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    let output = boar_lookup()
        .args([
            "summary",
            "D1402",
            "--format",
            "json",
            "-c",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("run summary");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["section"], "performance");
    assert_eq!(json["outcome"]["status"], "records");
    assert_eq!(json["outcome"]["records"][0]["CR %"], "0.0");
    assert_eq!(json["outcome"]["records"][0]["Breed"], "Landrace");
}

#[test]
fn missing_source_file_is_reported_per_section() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    std::fs::remove_file(workspace.path().join("extractions.csv")).expect("remove extractions");
    boar_lookup()
        .args(["lookup", "1401", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("87.5"))
        .stdout(contains("unavailable: not found"));
}

#[test]
fn inspect_shows_detected_header_and_resolution() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args(["inspect", "--section", "performance", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("header row 1: Grade | Breed | Tag ID"))
        .stdout(contains("name 'Tag ID'"));
}

#[test]
fn inspect_history_reports_positional_columns() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args(["inspect", "--section", "history", "-c", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("5 data row(s), 11 column(s)"))
        .stdout(contains("position"));
}

#[test]
fn interactive_answers_each_line_until_quit() {
    let workspace = TestWorkspace::new();
    let config = workspace.with_sample_sources();
    boar_lookup()
        .args(["interactive", "-c", config.to_str().unwrap()])
        .write_stdin("1401\n\nquit\n2207\n")
        .assert()
        .success()
        .stdout(contains("87.5"))
        .stdout(contains(AWAITING_INPUT_MESSAGE))
        .stdout(contains("pending").not());
}

#[test]
fn config_command_writes_loadable_default() {
    let workspace = TestWorkspace::new();
    boar_lookup()
        .arg("config")
        .assert()
        .success()
        .stdout(contains("docs.google.com"));

    let path = workspace.path().join("default.yaml");
    boar_lookup()
        .args(["config", "-o", path.to_str().unwrap()])
        .assert()
        .success();
    let loaded = LookupConfig::load(&path).expect("load written config");
    assert_eq!(loaded, LookupConfig::default());
}

#[test]
fn invalid_config_fails_with_message() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("bad.yaml", "performance: [unclosed");
    boar_lookup()
        .args(["lookup", "1401", "-c", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("error:"));
}
