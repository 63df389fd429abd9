use serde::Serialize;

use crate::core::{ResultSet, Row};

/// First row of `database_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub log_mode: Option<String>,
    pub supplemental_min: String,
    pub supplemental_all: String,
    pub cdb: Option<String>,
    pub database_name: Option<String>,
    pub version: Option<String>,
}

impl DatabaseInfo {
    pub fn from_row(row: &Row) -> Self {
        Self {
            log_mode: row.text("LOG_MODE"),
            supplemental_min: row
                .text("SUPPLEMENTAL_LOG_DATA_MIN")
                .unwrap_or_else(|| "NO".to_string()),
            supplemental_all: row
                .text("SUPPLEMENTAL_LOG_DATA_ALL")
                .unwrap_or_else(|| "NO".to_string()),
            cdb: row.text("CDB"),
            database_name: row.text("DATABASE_NAME"),
            version: row.text("VERSION"),
        }
    }

    pub fn from_result(rows: &ResultSet) -> Option<Self> {
        rows.first().map(Self::from_row)
    }

    pub fn is_archivelog(&self) -> bool {
        self.log_mode.as_deref() == Some("ARCHIVELOG")
    }

    pub fn is_cdb(&self) -> bool {
        self.cdb.as_deref() == Some("YES")
    }
}

/// One row of `users_check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub username: Option<String>,
    pub account_status: Option<String>,
    pub common: bool,
    pub default_tablespace: String,
}

impl UserAccount {
    pub fn from_row(row: &Row) -> Self {
        Self {
            username: row.text("USERNAME"),
            account_status: row.text("ACCOUNT_STATUS"),
            common: row.text("COMMON").as_deref() == Some("YES"),
            default_tablespace: row
                .text("DEFAULT_TABLESPACE")
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }

    pub fn find<'a>(accounts: &'a [UserAccount], name: &str) -> Option<&'a UserAccount> {
        accounts
            .iter()
            .find(|a| a.username.as_deref() == Some(name))
    }

    pub fn is_open(&self) -> bool {
        self.account_status.as_deref() == Some("OPEN")
    }

    pub fn status_label(&self) -> &str {
        self.account_status.as_deref().unwrap_or("UNKNOWN")
    }
}

/// First row of `xstream_outbound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundServer {
    pub server_name: Option<String>,
    pub status: Option<String>,
    pub connect_user: Option<String>,
    pub queue_name: String,
}

impl OutboundServer {
    pub fn from_row(row: &Row) -> Self {
        Self {
            server_name: row.text("SERVER_NAME"),
            status: row.text("STATUS"),
            connect_user: row.text("CONNECT_USER"),
            queue_name: row.text("QUEUE_NAME").unwrap_or_else(|| "N/A".to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status.as_deref(), Some("ENABLED" | "ATTACHED"))
    }

    pub fn name_label(&self) -> &str {
        self.server_name.as_deref().unwrap_or("N/A")
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("UNKNOWN")
    }

    pub fn connect_user_label(&self) -> &str {
        self.connect_user.as_deref().unwrap_or("N/A")
    }
}

/// First row of `current_container`. Display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerContext {
    pub container_name: String,
    pub container_id: String,
    pub current_user: Option<String>,
    pub session_user: Option<String>,
}

impl ContainerContext {
    pub fn from_row(row: &Row) -> Self {
        Self {
            container_name: row
                .text("CONTAINER_NAME")
                .unwrap_or_else(|| "Unknown".to_string()),
            container_id: row.text("CONTAINER_ID").unwrap_or_else(|| "N/A".to_string()),
            current_user: row.text("CURRENT_USER"),
            session_user: row.text("SESSION_USER"),
        }
    }

    pub fn from_result(rows: &ResultSet) -> Option<Self> {
        rows.first().map(Self::from_row)
    }
}
