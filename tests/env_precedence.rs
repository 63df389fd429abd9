use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

const MISCONFIGURED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/misconfigured.json");
const HEALTHY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/healthy.json");

fn base_cmd(home: &Path) -> Command {
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

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);

    let temp = std::env::temp_dir();
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let uniq = format!("oraverify-env-test-{}-{seq}", std::process::id());
    let home = temp.join(uniq);
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

#[test]
fn env_overrides_config_file() {
    let home = make_temp_home();
    write_file(
        home.join(".config/oraverify/config.toml").as_path(),
        br#"
[report]
show_remediation = true
"#,
    );

    let out = {
        let mut cmd = base_cmd(&home);
        cmd.env("ORAVERIFY_REPORT_SHOW_REMEDIATION", "false");
        cmd.args(["verify", "--details", "--from-results", MISCONFIGURED]);
        cmd.output().expect("run oraverify")
    };
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("[FAIL] Archive Log Mode"), "stdout={stdout}");
    assert!(!stdout.contains("STARTUP MOUNT"), "stdout={stdout}");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn env_table_rows_override_config() {
    let home = make_temp_home();
    write_file(
        home.join(".config/oraverify/config.toml").as_path(),
        br#"
[ui]
max_table_rows = 50
"#,
    );

    let out = {
        let mut cmd = base_cmd(&home);
        cmd.env("ORAVERIFY_UI_MAX_TABLE_ROWS", "1");
        cmd.args(["show", "containers", "--from-results", HEALTHY]);
        cmd.output().expect("run oraverify")
    };
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Current container (current_container):"), "stdout={stdout}");
    assert!(stdout.contains("... (1 more rows)"), "stdout={stdout}");
    assert!(!stdout.contains("ORCLPDB1"), "stdout={stdout}");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_env_value_exits_2() {
    let home = make_temp_home();
    let out = {
        let mut cmd = base_cmd(&home);
        cmd.env("ORAVERIFY_LOGS_ENABLED", "sometimes");
        cmd.arg("guide");
        cmd.output().expect("run oraverify")
    };
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("ORAVERIFY_LOGS_ENABLED"), "stderr={stderr}");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn cli_config_path_overrides_env_config_path() {
    let home = make_temp_home();

    let cfg_env = home.join("env-config.toml");
    let cfg_cli = home.join("cli-config.toml");
    write_file(
        cfg_env.as_path(),
        br#"
[report]
show_remediation = false
"#,
    );
    write_file(
        cfg_cli.as_path(),
        br#"
[report]
show_remediation = true
"#,
    );

    let out = {
        let mut cmd = base_cmd(&home);
        cmd.env("ORAVERIFY_CONFIG", &cfg_env);
        cmd.arg("--config");
        cmd.arg(&cfg_cli);
        cmd.args(["verify", "--details", "--from-results", MISCONFIGURED]);
        cmd.output().expect("run oraverify")
    };

    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("STARTUP MOUNT;"), "stdout={stdout}");

    let _ = std::fs::remove_dir_all(&home);
}

#[cfg(unix)]
mod live {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const PROFILES: &[u8] = br#"
default_profile = "prod"

[profiles.prod]
hostname = "prod-db"
service_name = "ORCLCDB"
username = "system"
password_env = "PROD_DB_PASSWORD"

[profiles.lab]
hostname = "lab-db"
port = 1522
service_name = "FREE"
username = "c##verifier"
password = "labpass"
"#;

    /// Records every script it receives and answers the probe and `v$database`.
    fn install_fake_sqlplus(home: &Path) -> PathBuf {
        let path = home.join("bin/sqlplus");
        write_file(
            path.as_path(),
            br#"#!/bin/sh
script=$(cat)
printf '%s\n' "$script" > "$HOME/last-script.sql"
case "$script" in
  *"1 AS OK FROM DUAL"*)
    echo '"OK"'
    echo '1'
    ;;
  *'FROM v$database d'*)
    echo '"DATABASE_NAME","CDB","LOG_MODE","SUPPLEMENTAL_LOG_DATA_MIN","SUPPLEMENTAL_LOG_DATA_ALL","VERSION"'
    echo '"ORCLCDB","YES","ARCHIVELOG","YES","NO","Oracle Database 19c"'
    ;;
esac
exit 0
"#,
        );
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    fn last_script(home: &Path) -> String {
        std::fs::read_to_string(home.join("last-script.sql")).expect("read script")
    }

    #[test]
    fn env_profile_overrides_default_profile() {
        let home = make_temp_home();
        write_file(home.join(".config/oraverify/config.toml").as_path(), PROFILES);
        let sqlplus = install_fake_sqlplus(&home);

        let out = base_cmd(&home)
            .env("ORAVERIFY_GATEWAY_SQLPLUS", &sqlplus)
            .env("ORAVERIFY_PROFILE", "lab")
            .arg("ping")
            .output()
            .expect("run oraverify");
        assert!(
            out.status.success(),
            "stderr={}",
            String::from_utf8_lossy(&out.stderr)
        );

        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("Connected: c##verifier@lab-db:1522/FREE"), "{stdout}");
        assert!(stdout.contains("Supplemental logging: MIN: YES, ALL: NO"), "{stdout}");
        assert!(
            last_script(&home).contains("CONNECT c##verifier/\"labpass\"@//lab-db:1522/FREE"),
            "{}",
            last_script(&home)
        );
        let _ = std::fs::remove_dir_all(&home);
    }

    #[test]
    fn flags_override_profile_fields_and_password_env() {
        let home = make_temp_home();
        write_file(home.join(".config/oraverify/config.toml").as_path(), PROFILES);
        let sqlplus = install_fake_sqlplus(&home);

        let out = base_cmd(&home)
            .env("ORAVERIFY_GATEWAY_SQLPLUS", &sqlplus)
            .env("ORAVERIFY_PROFILE", "lab")
            .env("PROD_DB_PASSWORD", "prodpass")
            .env("OTHER_PASSWORD", "flagpass")
            .args([
                "ping",
                "--profile",
                "prod",
                "--host",
                "standby-db",
                "--password-env",
                "OTHER_PASSWORD",
                "--json",
            ])
            .output()
            .expect("run oraverify");
        assert!(
            out.status.success(),
            "stderr={}",
            String::from_utf8_lossy(&out.stderr)
        );

        let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
        assert_eq!(v["target"], "standby-db:1521/ORCLCDB");
        assert_eq!(v["database"]["log_mode"], "ARCHIVELOG");
        let script = last_script(&home);
        assert!(
            script.contains("CONNECT system/\"flagpass\"@//standby-db:1521/ORCLCDB"),
            "{script}"
        );
        let _ = std::fs::remove_dir_all(&home);
    }

    #[test]
    fn profile_password_env_must_be_set() {
        let home = make_temp_home();
        write_file(home.join(".config/oraverify/config.toml").as_path(), PROFILES);
        let sqlplus = install_fake_sqlplus(&home);

        let out = base_cmd(&home)
            .env("ORAVERIFY_GATEWAY_SQLPLUS", &sqlplus)
            .env("ORAVERIFY_PASSWORD", "fallback")
            .env_remove("PROD_DB_PASSWORD")
            .arg("ping")
            .output()
            .expect("run oraverify");
        assert_eq!(out.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(
            stderr.contains("environment variable PROD_DB_PASSWORD is not set"),
            "{stderr}"
        );
        assert!(!home.join("last-script.sql").exists());
        let _ = std::fs::remove_dir_all(&home);
    }
}
