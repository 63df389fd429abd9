mod records;

pub use records::{ContainerContext, DatabaseInfo, OutboundServer, UserAccount};

use crate::catalog::REQUIRED_USERS;
use crate::core::{Finding, FindingsReport, QueryName, ResultSetCollection};
use crate::remediation;

pub const CATEGORY_DATABASE: &str = "Database";
pub const CATEGORY_USERS: &str = "Users";
pub const CATEGORY_XSTREAM: &str = "XStream";

/// Evaluates every rule group against the collected result sets.
///
/// Groups run in a fixed order (Database, Users, XStream) and each one is skipped when
/// its input was not collected. Nothing here fails: missing columns fall back to the
/// record defaults.
pub fn analyze(results: &ResultSetCollection) -> FindingsReport {
    let mut details = Vec::new();
    details.extend(database_rules(results));
    details.extend(user_rules(results));
    details.extend(xstream_rules(results));
    FindingsReport::from_findings(details)
}

pub fn database_rules(results: &ResultSetCollection) -> Vec<Finding> {
    let Some(info) = results
        .non_empty(QueryName::DatabaseInfo)
        .and_then(DatabaseInfo::from_result)
    else {
        return vec![];
    };

    vec![
        archive_log_mode(&info),
        supplemental_logging(&info),
        container_database(&info),
    ]
}

fn archive_log_mode(info: &DatabaseInfo) -> Finding {
    const CHECK: &str = "Archive Log Mode";
    if info.is_archivelog() {
        Finding::pass(CATEGORY_DATABASE, CHECK, "Database is in ARCHIVELOG mode")
            .with_value(info.log_mode.clone())
    } else {
        Finding::fail(
            CATEGORY_DATABASE,
            CHECK,
            "Database must be in ARCHIVELOG mode for CDC",
        )
        .with_value(info.log_mode.clone())
        .with_remediation(remediation::ENABLE_ARCHIVELOG)
    }
}

// ALL COLUMNS implies minimal logging; minimal alone still meets the requirement.
fn supplemental_logging(info: &DatabaseInfo) -> Finding {
    const CHECK: &str = "Supplemental Logging";
    let value = Some(format!(
        "MIN: {}, ALL: {}",
        info.supplemental_min, info.supplemental_all
    ));

    if info.supplemental_all == "YES" {
        Finding::pass(
            CATEGORY_DATABASE,
            CHECK,
            "Full supplemental logging (ALL COLUMNS) is enabled",
        )
        .with_value(value)
    } else if info.supplemental_min == "YES" {
        Finding::pass(
            CATEGORY_DATABASE,
            CHECK,
            "Minimal supplemental logging is enabled (consider upgrading to ALL COLUMNS)",
        )
        .with_value(value)
        .with_remediation(remediation::UPGRADE_SUPPLEMENTAL_LOGGING)
    } else {
        Finding::fail(CATEGORY_DATABASE, CHECK, "Supplemental logging must be enabled")
            .with_value(value)
            .with_remediation(remediation::ENABLE_SUPPLEMENTAL_LOGGING)
    }
}

fn container_database(info: &DatabaseInfo) -> Finding {
    const CHECK: &str = "Container Database";
    if info.is_cdb() {
        Finding::pass(
            CATEGORY_DATABASE,
            CHECK,
            "Database is a Container Database (CDB)",
        )
        .with_value(info.cdb.clone())
    } else {
        Finding::warning(
            CATEGORY_DATABASE,
            CHECK,
            "Database is not a CDB. Ensure proper configuration for non-CDB",
        )
        .with_value(info.cdb.clone())
    }
}

pub fn user_rules(results: &ResultSetCollection) -> Vec<Finding> {
    let Some(rows) = results.non_empty(QueryName::UsersCheck) else {
        return vec![];
    };
    let accounts: Vec<UserAccount> = rows.rows.iter().map(UserAccount::from_row).collect();

    REQUIRED_USERS
        .iter()
        .map(|name| required_user(name, UserAccount::find(&accounts, name)))
        .collect()
}

fn required_user(name: &str, account: Option<&UserAccount>) -> Finding {
    let check = format!("User {name}");
    let Some(account) = account else {
        return Finding::fail(
            CATEGORY_USERS,
            check,
            format!("User {name} does not exist in CDB$ROOT"),
        )
        .with_remediation(remediation::create_common_user(name));
    };

    let status = account.status_label();
    if account.is_open() {
        Finding::pass(CATEGORY_USERS, check, format!("User {name} exists and is OPEN")).with_value(
            Some(format!(
                "Status: {status}, Common: {}, Tablespace: {}",
                if account.common { "YES" } else { "NO" },
                account.default_tablespace
            )),
        )
    } else {
        Finding::fail(
            CATEGORY_USERS,
            check,
            format!("User {name} is {status} (should be OPEN)"),
        )
        .with_value(Some(format!("Status: {status}")))
        .with_remediation(remediation::unlock_user(name))
    }
}

pub fn xstream_rules(results: &ResultSetCollection) -> Vec<Finding> {
    const CHECK: &str = "Outbound Server";
    let Some(rows) = results.get(QueryName::XstreamOutbound) else {
        return vec![];
    };

    let finding = match rows.first().map(OutboundServer::from_row) {
        None => Finding::fail(CATEGORY_XSTREAM, CHECK, "No XStream outbound server configured")
            .with_remediation(remediation::CREATE_OUTBOUND_SERVER),
        Some(server) if server.is_running() => Finding::pass(
            CATEGORY_XSTREAM,
            CHECK,
            format!(
                "XStream outbound server '{}' is {}",
                server.name_label(),
                server.status_label()
            ),
        )
        .with_value(Some(format!(
            "Connect User: {}, Queue: {}",
            server.connect_user_label(),
            server.queue_name
        ))),
        Some(server) => Finding::warning(
            CATEGORY_XSTREAM,
            CHECK,
            format!("XStream outbound server status is {}", server.status_label()),
        )
        .with_value(Some(format!("Server: {}", server.name_label()))),
    };
    vec![finding]
}

/// Session context shown next to the report, when it was collected.
pub fn container_context(results: &ResultSetCollection) -> Option<ContainerContext> {
    results
        .non_empty(QueryName::CurrentContainer)
        .and_then(ContainerContext::from_result)
}
