use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

use oraverify::core::ResultSetCollection;

const MISCONFIGURED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/misconfigured.json");

fn oraverify_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_oraverify"));
    cmd.env("HOME", home);
    for var in [
        "ORAVERIFY_CONFIG",
        "ORAVERIFY_UI_COLOR",
        "ORAVERIFY_UI_MAX_TABLE_ROWS",
        "ORAVERIFY_GATEWAY_SQLPLUS",
        "ORAVERIFY_GATEWAY_ROOT_CONTAINER",
        "ORAVERIFY_CHECKS_GROUPS",
        "ORAVERIFY_REPORT_SHOW_REMEDIATION",
        "ORAVERIFY_LOGS_ENABLED",
        "ORAVERIFY_PROFILE",
        "ORAVERIFY_PASSWORD",
        "ORAVERIFY_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    oraverify_cmd(home).args(args).output().expect("run oraverify")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let home =
        std::env::temp_dir().join(format!("oraverify-golden-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn golden() -> serde_json::Value {
    serde_json::from_str(include_str!("golden/findings_report.json")).expect("parse golden json")
}

#[test]
fn analyzer_output_matches_golden() {
    let results: ResultSetCollection =
        serde_json::from_str(include_str!("fixtures/misconfigured.json")).expect("parse fixture");
    let report = oraverify::rules::analyze(&results);

    let actual = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(actual, golden());
}

#[test]
fn verify_json_export_matches_golden() {
    let home = make_temp_home();
    let out = run(&home, &["verify", "--from-results", MISCONFIGURED, "--json"]);
    assert_eq!(
        out.status.code(),
        Some(1),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let actual: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse stdout");
    assert_eq!(actual, golden());
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn verify_output_file_matches_golden() {
    let home = make_temp_home();
    let report_path = home.join("report.json");
    let out = oraverify_cmd(&home)
        .args(["--quiet", "verify", "--from-results", MISCONFIGURED, "--output"])
        .arg(&report_path)
        .output()
        .expect("run oraverify");
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty(), "stdout={}", String::from_utf8_lossy(&out.stdout));

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&report_path).expect("read report")).expect("json");
    assert_eq!(written, golden());
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn saved_results_replay_to_the_same_export() {
    let home = make_temp_home();
    let saved = home.join("saved.json");

    let first = oraverify_cmd(&home)
        .args(["verify", "--from-results", MISCONFIGURED, "--json", "--save-results"])
        .arg(&saved)
        .output()
        .expect("run oraverify");
    assert_eq!(first.status.code(), Some(1));

    let saved_json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&saved).expect("read saved")).expect("json");
    assert!(saved_json.get("legacy_probe").is_none(), "{saved_json}");
    assert_eq!(saved_json["database_info"]["rows"][0]["LOG_MODE"], "NOARCHIVELOG");

    let second = oraverify_cmd(&home)
        .args(["verify", "--json", "--from-results"])
        .arg(&saved)
        .output()
        .expect("run oraverify");
    assert_eq!(second.status.code(), Some(1));
    assert_eq!(first.stdout, second.stdout);
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn replay_honors_selected_check_groups() {
    let home = make_temp_home();
    let out = run(
        &home,
        &["verify", "--json", "--checks", "xstream", "--from-results", MISCONFIGURED],
    );
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let categories: Vec<&str> = v["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(|f| f["category"].as_str())
        .collect();
    assert_eq!(categories, vec!["XStream"]);
    assert_eq!(v["summary"]["total_checks"], 1);
    assert_eq!(v["summary"]["warnings"], 1);

    let env_out = oraverify_cmd(&home)
        .env("ORAVERIFY_CHECKS_GROUPS", "users")
        .args(["verify", "--json", "--from-results", MISCONFIGURED])
        .output()
        .expect("run oraverify");
    assert_eq!(env_out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&env_out.stdout).expect("parse json");
    assert_eq!(v["summary"]["total_checks"], 2);
    assert_eq!(v["summary"]["failed"], 2);
    let _ = std::fs::remove_dir_all(&home);
}
