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
        std::env::temp_dir().join(format!("oraverify-exit-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

#[test]
fn passing_replay_exits_0() {
    let home = make_temp_home();
    let out = run(&home, &["verify", "--from-results", HEALTHY]);
    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Overall: PASS - database is correctly configured"), "{stdout}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn failing_replay_exits_1() {
    let home = make_temp_home();
    let out = run(&home, &["verify", "--from-results", MISCONFIGURED]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("verification failed: 3 check(s) failed"), "{stderr}");
    assert!(!stderr.contains("next:"), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn completion_unknown_shell_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn completion_bash_succeeds() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "bash"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("oraverify"));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn ui_requires_tty_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["ui", "--from-results", HEALTHY]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn unknown_check_group_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["verify", "--checks", "database,network"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("network"), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn missing_connection_details_exit_2() {
    let home = make_temp_home();
    let out = run(&home, &["verify", "--host", "db.example.com"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no service given"), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn unknown_query_name_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["queries", "dba_everything"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn unreadable_results_file_exits_10() {
    let home = make_temp_home();
    let missing = home.join("missing.json");
    let out = oraverify_cmd(&home)
        .args(["verify", "--from-results"])
        .arg(&missing)
        .output()
        .expect("run oraverify");
    assert_eq!(out.status.code(), Some(10));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to read results file"), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[cfg(unix)]
#[test]
fn unreachable_database_exits_20() {
    use std::os::unix::fs::PermissionsExt;

    let home = make_temp_home();
    let sqlplus = home.join("bin/sqlplus");
    std::fs::create_dir_all(home.join("bin")).expect("mkdir bin");
    std::fs::write(
        &sqlplus,
        "#!/bin/sh\ncat >/dev/null\necho 'ERROR:'\necho 'ORA-12541: TNS:no listener'\nexit 1\n",
    )
    .expect("write sqlplus");
    let mut perms = std::fs::metadata(&sqlplus).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&sqlplus, perms).expect("chmod");

    let out = oraverify_cmd(&home)
        .env("ORAVERIFY_GATEWAY_SQLPLUS", &sqlplus)
        .env("ORAVERIFY_PASSWORD", "secret")
        .args([
            "verify", "--host", "db", "--service", "ORCLCDB", "--user", "system", "--json",
        ])
        .output()
        .expect("run oraverify");

    assert_eq!(out.status.code(), Some(20));
    assert!(out.stdout.is_empty(), "no report on connectivity failure");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("cannot connect to db:1521/ORCLCDB"), "{stderr}");
    assert!(stderr.contains("ORA-12541"), "{stderr}");
    assert!(!stderr.contains("secret"), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn missing_sqlplus_binary_exits_20() {
    let home = make_temp_home();
    let out = oraverify_cmd(&home)
        .env("ORAVERIFY_GATEWAY_SQLPLUS", home.join("no-such-sqlplus"))
        .env("ORAVERIFY_PASSWORD", "secret")
        .args(["ping", "--host", "db", "--service", "ORCLCDB", "--user", "system"])
        .output()
        .expect("run oraverify");
    assert_eq!(out.status.code(), Some(20));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to launch"), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn multi_line_host_is_rejected_before_connecting() {
    let home = make_temp_home();
    let out = oraverify_cmd(&home)
        .env("ORAVERIFY_GATEWAY_SQLPLUS", home.join("no-such-sqlplus"))
        .env("ORAVERIFY_PASSWORD", "secret")
        .args([
            "ping",
            "--host",
            "db\nHOST touch /tmp/owned",
            "--service",
            "ORCLCDB",
            "--user",
            "system",
        ])
        .output()
        .expect("run oraverify");
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("host contains unsupported characters"), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}
