use std::time::Duration;

use thiserror::Error;

/// Failure of one statement against the database.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("{code}: {message}")]
    Database { code: String, message: String },

    #[error("unreadable client output: {0}")]
    Output(String),
}

impl QueryError {
    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Errors that mean the target cannot be reached at all, as opposed to a
    /// statement being rejected. A timeout is not one: a single slow catalog view
    /// does not say the listener is gone.
    pub fn is_connectivity(&self) -> bool {
        match self {
            QueryError::Launch { .. } => true,
            QueryError::Timeout(_) => false,
            QueryError::Database { code, .. } => {
                code.starts_with("TNS-")
                    || matches!(
                        code.as_str(),
                        "ORA-01017" | "ORA-12154" | "ORA-12514" | "ORA-12541" | "ORA-12170" | "ORA-28000"
                    )
            }
            QueryError::Output(_) => false,
        }
    }
}
