use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::QueryName;

/// Context statement run once before the batch so the dictionary views see every container.
pub const SET_ROOT_CONTAINER: &str = "ALTER SESSION SET CONTAINER = CDB$ROOT";

/// Connectivity probe.
pub const PROBE: &str = "SELECT 1 AS OK FROM DUAL";

pub const XSTREAM_ADMIN_USER: &str = "C##XSTREAMADMIN";
pub const CONNECT_USER: &str = "C##CONNECTUSER";

/// Common accounts the connector expects, in the order they are checked.
pub const REQUIRED_USERS: [&str; 2] = [XSTREAM_ADMIN_USER, CONNECT_USER];

pub const XSTREAM_ADMIN_TABLESPACE: &str = "XSTREAM_ADM_TBS";
pub const CONNECT_USER_TABLESPACE: &str = "CONNECTUSER_TBS";

pub fn sql(name: QueryName) -> &'static str {
    match name {
        QueryName::DatabaseInfo => {
            "SELECT d.name AS database_name, d.cdb, d.log_mode, d.force_logging, \
             d.supplemental_log_data_min, d.supplemental_log_data_all, \
             (SELECT banner FROM v$version WHERE banner LIKE 'Oracle%') AS version \
             FROM v$database d"
        }
        QueryName::UsersCheck => {
            "SELECT username, account_status, common, default_tablespace, created, oracle_maintained \
             FROM dba_users \
             WHERE username IN ('C##XSTREAMADMIN', 'C##CONNECTUSER') \
             ORDER BY username"
        }
        QueryName::UserPrivileges => {
            "SELECT grantee, privilege, admin_option, common, inherited \
             FROM dba_sys_privs \
             WHERE grantee IN ('C##XSTREAMADMIN', 'C##CONNECTUSER') \
             ORDER BY grantee, privilege"
        }
        QueryName::UserRoles => {
            "SELECT grantee, granted_role, admin_option, common, inherited \
             FROM dba_role_privs \
             WHERE grantee IN ('C##XSTREAMADMIN', 'C##CONNECTUSER') \
             ORDER BY grantee, granted_role"
        }
        QueryName::Tablespaces => {
            "SELECT tablespace_name, status, contents, extent_management, \
             segment_space_management, bigfile \
             FROM dba_tablespaces \
             WHERE tablespace_name IN ('XSTREAM_ADM_TBS', 'CONNECTUSER_TBS')"
        }
        QueryName::TablespaceSize => {
            "SELECT tablespace_name, \
             ROUND(SUM(bytes)/1024/1024, 2) AS size_mb, \
             ROUND(SUM(maxbytes)/1024/1024, 2) AS max_size_mb, \
             MAX(autoextensible) AS autoextensible \
             FROM dba_data_files \
             WHERE tablespace_name IN ('XSTREAM_ADM_TBS', 'CONNECTUSER_TBS') \
             GROUP BY tablespace_name"
        }
        QueryName::UserQuotas => {
            "SELECT username, tablespace_name, \
             CASE WHEN max_bytes = -1 THEN 'UNLIMITED' \
             ELSE TO_CHAR(ROUND(max_bytes/1024/1024, 2)) END AS quota_mb \
             FROM dba_ts_quotas \
             WHERE username IN ('C##XSTREAMADMIN', 'C##CONNECTUSER')"
        }
        QueryName::XstreamOutbound => {
            "SELECT server_name, connect_user, capture_user, queue_owner, queue_name, status \
             FROM dba_xstream_outbound"
        }
        QueryName::XstreamCapture => {
            "SELECT capture_name, status, queue_name, rule_set_name, start_scn, \
             captured_scn, applied_scn, required_checkpoint_scn \
             FROM dba_capture"
        }
        QueryName::XstreamCaptureStats => {
            "SELECT capture_name, state, total_messages_captured, total_messages_enqueued \
             FROM v$xstream_capture"
        }
        QueryName::Queues => {
            "SELECT name, queue_table, queue_type, enqueue_enabled, dequeue_enabled, \
             retention, user_comment \
             FROM dba_queues \
             WHERE queue_table LIKE '%XOUT%' OR name LIKE '%XOUT%'"
        }
        QueryName::Containers => {
            "SELECT con_id, name, open_mode, restricted FROM v$containers ORDER BY con_id"
        }
        QueryName::CurrentContainer => {
            "SELECT SYS_CONTEXT('USERENV', 'CON_NAME') AS container_name, \
             SYS_CONTEXT('USERENV', 'CON_ID') AS container_id, \
             SYS_CONTEXT('USERENV', 'CURRENT_USER') AS current_user, \
             SYS_CONTEXT('USERENV', 'SESSION_USER') AS session_user \
             FROM dual"
        }
    }
}

pub fn describe(name: QueryName) -> &'static str {
    match name {
        QueryName::DatabaseInfo => "database name, CDB flag, log mode, supplemental logging, version",
        QueryName::UsersCheck => "required common accounts and their status",
        QueryName::UserPrivileges => "system privileges granted to the required accounts",
        QueryName::UserRoles => "roles granted to the required accounts",
        QueryName::Tablespaces => "connector tablespaces",
        QueryName::TablespaceSize => "connector tablespace sizes",
        QueryName::UserQuotas => "tablespace quotas of the required accounts",
        QueryName::XstreamOutbound => "XStream outbound servers",
        QueryName::XstreamCapture => "capture processes",
        QueryName::XstreamCaptureStats => "capture process statistics",
        QueryName::Queues => "outbound queues",
        QueryName::Containers => "containers of the CDB",
        QueryName::CurrentContainer => "session container and users",
    }
}

/// Operator-selectable areas of the verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckGroup {
    Database,
    Users,
    Privileges,
    Xstream,
    Tablespaces,
}

impl CheckGroup {
    pub const ALL: [CheckGroup; 5] = [
        CheckGroup::Database,
        CheckGroup::Users,
        CheckGroup::Privileges,
        CheckGroup::Xstream,
        CheckGroup::Tablespaces,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CheckGroup::Database => "database",
            CheckGroup::Users => "users",
            CheckGroup::Privileges => "privileges",
            CheckGroup::Xstream => "xstream",
            CheckGroup::Tablespaces => "tablespaces",
        }
    }

    pub const fn queries(self) -> &'static [QueryName] {
        match self {
            CheckGroup::Database => &[QueryName::DatabaseInfo],
            CheckGroup::Users => &[QueryName::UsersCheck],
            CheckGroup::Privileges => &[QueryName::UserPrivileges, QueryName::UserRoles],
            CheckGroup::Xstream => &[
                QueryName::XstreamOutbound,
                QueryName::XstreamCapture,
                QueryName::XstreamCaptureStats,
                QueryName::Queues,
            ],
            CheckGroup::Tablespaces => &[
                QueryName::Tablespaces,
                QueryName::TablespaceSize,
                QueryName::UserQuotas,
            ],
        }
    }
}

impl fmt::Display for CheckGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        CheckGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "invalid check group: {s} (expected database|users|privileges|xstream|tablespaces)"
                )
            })
    }
}

/// Parses a comma-separated group list. `all` selects every group.
pub fn parse_groups(s: &str) -> Result<Vec<CheckGroup>, String> {
    let mut out = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part.eq_ignore_ascii_case("all") {
            return Ok(CheckGroup::ALL.to_vec());
        }
        let group = part.parse::<CheckGroup>()?;
        if !out.contains(&group) {
            out.push(group);
        }
    }
    if out.is_empty() {
        return Err("no check group given".to_string());
    }
    out.sort();
    Ok(out)
}

/// Queries to run for the selected groups, in catalog order. Context queries always run.
pub fn plan(groups: &[CheckGroup]) -> Vec<QueryName> {
    QueryName::ALL
        .into_iter()
        .filter(|q| {
            matches!(q, QueryName::Containers | QueryName::CurrentContainer)
                || groups.iter().any(|g| g.queries().contains(q))
        })
        .collect()
}
