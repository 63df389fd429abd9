use serde::Serialize;

use crate::catalog::{
    CONNECT_USER, CONNECT_USER_TABLESPACE, XSTREAM_ADMIN_TABLESPACE, XSTREAM_ADMIN_USER,
};

pub const ENABLE_ARCHIVELOG: &str = "SHUTDOWN IMMEDIATE;\nSTARTUP MOUNT;\nALTER DATABASE ARCHIVELOG;\nALTER DATABASE OPEN;";

pub const ENABLE_SUPPLEMENTAL_LOGGING: &str =
    "ALTER SESSION SET CONTAINER = CDB$ROOT;\nALTER DATABASE ADD SUPPLEMENTAL LOG DATA (ALL) COLUMNS;";

pub const UPGRADE_SUPPLEMENTAL_LOGGING: &str =
    "Recommended: ALTER DATABASE ADD SUPPLEMENTAL LOG DATA (ALL) COLUMNS;";

pub const CREATE_OUTBOUND_SERVER: &str =
    "Execute DBMS_XSTREAM_ADM.CREATE_OUTBOUND to create server";

pub fn unlock_user(user: &str) -> String {
    format!("ALTER USER {user} ACCOUNT UNLOCK;")
}

pub fn create_common_user(user: &str) -> String {
    format!(
        "ALTER SESSION SET CONTAINER = CDB$ROOT;\nCREATE USER {user} IDENTIFIED BY password CONTAINER=ALL;"
    )
}

/// One entry of the remediation guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuideSection {
    pub title: &'static str,
    pub summary: &'static str,
    pub sql: String,
}

const XSTREAM_ADMIN_GRANTS: [&str; 4] = [
    "CREATE SESSION",
    "SET CONTAINER",
    "SELECT ANY DICTIONARY",
    "EXECUTE_CATALOG_ROLE",
];

const CONNECT_USER_GRANTS: [&str; 4] = [
    "CREATE SESSION",
    "SET CONTAINER",
    "SELECT ANY TABLE",
    "SELECT_CATALOG_ROLE",
];

pub fn guide() -> Vec<GuideSection> {
    vec![
        GuideSection {
            title: "Enable Archive Log Mode",
            summary: "Requires a database restart.",
            sql: format!("-- Enable archive log mode\n{ENABLE_ARCHIVELOG}"),
        },
        GuideSection {
            title: "Enable Supplemental Logging",
            summary: "Full supplemental logging (ALL COLUMNS) is the recommended setting.",
            sql: format!(
                "{ENABLE_SUPPLEMENTAL_LOGGING}\n\n-- Verify\nSELECT supplemental_log_data_min, supplemental_log_data_all FROM v$database;\n-- Expected: SUPPLEMENTAL_LOG_DATA_ALL = YES"
            ),
        },
        GuideSection {
            title: "Create Common Users",
            summary: "Both accounts must exist in CDB$ROOT and be valid in every container.",
            sql: [
                create_user_sql(XSTREAM_ADMIN_USER, XSTREAM_ADMIN_TABLESPACE),
                create_user_sql(CONNECT_USER, CONNECT_USER_TABLESPACE),
            ]
            .join("\n\n"),
        },
        GuideSection {
            title: "Grant Required Privileges",
            summary: "Grants are issued with CONTAINER=ALL.",
            sql: [
                grants_sql(XSTREAM_ADMIN_USER, &XSTREAM_ADMIN_GRANTS),
                grants_sql(CONNECT_USER, &CONNECT_USER_GRANTS),
            ]
            .join("\n\n"),
        },
    ]
}

fn create_user_sql(user: &str, tablespace: &str) -> String {
    let user = user.to_ascii_lowercase();
    let tablespace = tablespace.to_ascii_lowercase();
    format!(
        "-- Create {upper}\nCREATE USER {user} IDENTIFIED BY \"<password>\"\n  DEFAULT TABLESPACE {tablespace}\n  QUOTA UNLIMITED ON {tablespace}\n  CONTAINER = ALL;",
        upper = user.to_ascii_uppercase()
    )
}

fn grants_sql(user: &str, grants: &[&str]) -> String {
    let lower = user.to_ascii_lowercase();
    let mut out = format!("-- Grants for {user}");
    for grant in grants {
        out.push_str(&format!("\nGRANT {grant} TO {lower} CONTAINER=ALL;"));
    }
    out
}
