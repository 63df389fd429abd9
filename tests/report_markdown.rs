use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

const HEALTHY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/healthy.json");
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
        std::env::temp_dir().join(format!("oraverify-markdown-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

#[test]
fn markdown_report_has_summary_and_categories() {
    let home = make_temp_home();
    let out = run(&home, &["verify", "--markdown", "--from-results", MISCONFIGURED]);
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.starts_with("# Oracle XStream configuration report\n"),
        "stdout={stdout}"
    );
    assert!(stdout.contains("- Overall: **FAIL**"), "stdout={stdout}");
    assert!(stdout.contains("- Container: CDB$ROOT (ID: 1)"), "stdout={stdout}");
    assert!(stdout.contains("| 6 | 1 | 3 | 2 |"), "stdout={stdout}");

    let database = stdout.find("## Database (FAIL)").expect("database section");
    let users = stdout.find("## Users (FAIL)").expect("users section");
    let xstream = stdout.find("## XStream (WARNING)").expect("xstream section");
    assert!(database < users && users < xstream, "stdout={stdout}");

    assert!(stdout.contains("### [WARN] Container Database"), "stdout={stdout}");
    assert!(stdout.contains("- Value: `MIN: YES, ALL: NO`"), "stdout={stdout}");
    assert!(
        stdout.contains("```sql\nALTER USER C##XSTREAMADMIN ACCOUNT UNLOCK;\n```"),
        "stdout={stdout}"
    );
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn markdown_report_for_healthy_database_passes() {
    let home = make_temp_home();
    let out = run(&home, &["verify", "--markdown", "--from-results", HEALTHY]);
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("- Overall: **PASS**"), "stdout={stdout}");
    assert!(stdout.contains("| 6 | 6 | 0 | 0 |"), "stdout={stdout}");
    assert!(
        stdout.contains("XStream outbound server 'XOUT' is ATTACHED"),
        "stdout={stdout}"
    );
    assert!(!stdout.contains("[FAIL]"), "stdout={stdout}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn guide_and_queries_print_sql() {
    let home = make_temp_home();

    let guide = run(&home, &["guide"]);
    assert!(guide.status.success());
    let text = String::from_utf8_lossy(&guide.stdout);
    for title in [
        "## Enable Archive Log Mode",
        "## Enable Supplemental Logging",
        "## Create Common Users",
        "## Grant Required Privileges",
    ] {
        assert!(text.contains(title), "missing {title}: {text}");
    }
    assert!(text.contains("    ALTER DATABASE ARCHIVELOG;"), "{text}");

    let queries = run(&home, &["queries", "xstream_outbound"]);
    assert!(queries.status.success());
    let text = String::from_utf8_lossy(&queries.stdout);
    assert!(text.contains("-- xstream_outbound:"), "{text}");
    assert!(text.contains("FROM dba_xstream_outbound;"), "{text}");
    assert!(!text.contains("dba_users"), "{text}");

    let all = run(&home, &["queries", "--json"]);
    assert!(all.status.success());
    let v: serde_json::Value = serde_json::from_slice(&all.stdout).expect("parse json");
    let names: Vec<&str> = v
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|q| q["name"].as_str())
        .collect();
    assert_eq!(names.len(), 13);
    assert_eq!(names.first(), Some(&"database_info"));
    assert_eq!(names.last(), Some(&"current_container"));
    let _ = std::fs::remove_dir_all(&home);
}
