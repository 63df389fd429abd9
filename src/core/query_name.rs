use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names of the diagnostic queries. These are part of the public interface between
/// the gateway and the analyzer, and they are the keys of a saved results file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QueryName {
    DatabaseInfo,
    UsersCheck,
    UserPrivileges,
    UserRoles,
    Tablespaces,
    TablespaceSize,
    UserQuotas,
    XstreamOutbound,
    XstreamCapture,
    XstreamCaptureStats,
    Queues,
    Containers,
    CurrentContainer,
}

impl QueryName {
    pub const ALL: [QueryName; 13] = [
        QueryName::DatabaseInfo,
        QueryName::UsersCheck,
        QueryName::UserPrivileges,
        QueryName::UserRoles,
        QueryName::Tablespaces,
        QueryName::TablespaceSize,
        QueryName::UserQuotas,
        QueryName::XstreamOutbound,
        QueryName::XstreamCapture,
        QueryName::XstreamCaptureStats,
        QueryName::Queues,
        QueryName::Containers,
        QueryName::CurrentContainer,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            QueryName::DatabaseInfo => "database_info",
            QueryName::UsersCheck => "users_check",
            QueryName::UserPrivileges => "user_privileges",
            QueryName::UserRoles => "user_roles",
            QueryName::Tablespaces => "tablespaces",
            QueryName::TablespaceSize => "tablespace_size",
            QueryName::UserQuotas => "user_quotas",
            QueryName::XstreamOutbound => "xstream_outbound",
            QueryName::XstreamCapture => "xstream_capture",
            QueryName::XstreamCaptureStats => "xstream_capture_stats",
            QueryName::Queues => "queues",
            QueryName::Containers => "containers",
            QueryName::CurrentContainer => "current_container",
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        QueryName::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = QueryName::ALL.iter().map(|q| q.as_str()).collect();
                format!("unknown query name: {s} (expected one of {})", names.join("|"))
            })
    }
}
