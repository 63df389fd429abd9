use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog;
use crate::core::{QueryName, ResultSet, ResultSetCollection};

pub mod csv;
mod error;
mod sqlplus;

pub use error::QueryError;
pub use sqlplus::{ConnectParams, SqlPlusSession};

/// A database session that can run catalog statements.
///
/// Statements that succeed are expected to keep affecting later calls on the same
/// session (the root container switch in particular).
pub trait CatalogSession {
    /// Checks that the target is reachable and the credentials are accepted.
    fn probe(&mut self) -> Result<(), QueryError>;

    fn run_statement(&mut self, sql: &str) -> Result<(), QueryError>;

    fn query(&mut self, sql: &str) -> Result<ResultSet, QueryError>;
}

/// A query that failed and was replaced by an empty result.
#[derive(Debug, Clone, Serialize)]
pub struct QueryWarning {
    pub query: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryAttempt {
    pub query: QueryName,
    pub rows: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: ResultSetCollection,
    pub warnings: Vec<QueryWarning>,
    pub attempts: Vec<QueryAttempt>,
}

/// Outcome of the root container switch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContextSwitch {
    Entered,
    Skipped,
    Failed { message: String },
}

/// Switches the session to the root container.
///
/// A rejected statement is not fatal: the batch then runs in whatever container the
/// session started in, and the returned warning says so. Losing the connection is
/// returned as an error.
pub fn enter_root_container(
    session: &mut dyn CatalogSession,
) -> Result<(ContextSwitch, Option<QueryWarning>), QueryError> {
    match session.run_statement(catalog::SET_ROOT_CONTAINER) {
        Ok(()) => {
            tracing::debug!("session switched to CDB$ROOT");
            Ok((ContextSwitch::Entered, None))
        }
        Err(err) if err.is_connectivity() => Err(err),
        Err(err) => {
            tracing::debug!(error = %err, "could not switch to CDB$ROOT");
            let message = err.to_string();
            Ok((
                ContextSwitch::Failed {
                    message: message.clone(),
                },
                Some(QueryWarning {
                    query: "set_container".to_string(),
                    message: format!(
                        "could not set container to CDB$ROOT ({message}); continuing with the default container"
                    ),
                }),
            ))
        }
    }
}

/// Runs each query independently. A failing query yields an empty result under its
/// name and a warning; the rest of the batch still runs.
///
/// A connectivity error stops the batch: the remaining queries would fail the same
/// way, and their empty results would read as missing configuration.
pub fn run_batch(
    session: &mut dyn CatalogSession,
    queries: &[QueryName],
) -> Result<BatchOutcome, QueryError> {
    run_batch_with(session, queries, |_, _| {})
}

/// Like [`run_batch`], reporting `(done, total)` after each query.
pub fn run_batch_with(
    session: &mut dyn CatalogSession,
    queries: &[QueryName],
    mut on_progress: impl FnMut(usize, usize),
) -> Result<BatchOutcome, QueryError> {
    let mut out = BatchOutcome::default();
    for (idx, &name) in queries.iter().enumerate() {
        let started = Instant::now();
        let result = session.query(catalog::sql(name));
        let elapsed_ms = millis(started.elapsed());

        match result {
            Ok(rows) => {
                tracing::debug!(query = %name, rows = rows.len(), elapsed_ms, "query ok");
                out.attempts.push(QueryAttempt {
                    query: name,
                    rows: rows.len(),
                    elapsed_ms,
                    error: None,
                });
                out.results.insert(name, rows);
            }
            Err(err) if err.is_connectivity() => {
                tracing::debug!(query = %name, error = %err, "connection lost");
                return Err(err);
            }
            Err(err) => {
                tracing::debug!(query = %name, error = %err, "query failed");
                let message = err.to_string();
                out.attempts.push(QueryAttempt {
                    query: name,
                    rows: 0,
                    elapsed_ms,
                    error: Some(message.clone()),
                });
                out.warnings.push(QueryWarning {
                    query: name.to_string(),
                    message: format!("query {name} failed: {message}"),
                });
                out.results.insert(name, ResultSet::empty());
            }
        }
        on_progress(idx + 1, queries.len());
    }
    Ok(out)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;

    use super::*;

    /// Answers queries from a table keyed by SQL text.
    #[derive(Default)]
    pub struct FakeSession {
        pub probe_error: Option<String>,
        pub statement_error: Option<String>,
        pub answers: HashMap<&'static str, Result<ResultSet, String>>,
        /// Every statement after this many queries fails with `ORA-12541`.
        pub drop_after: Option<usize>,
        pub statements: Vec<String>,
        pub queries: Vec<String>,
    }

    impl FakeSession {
        pub fn answer(mut self, name: QueryName, rows: ResultSet) -> Self {
            self.answers.insert(catalog::sql(name), Ok(rows));
            self
        }

        pub fn reject(mut self, name: QueryName, message: &str) -> Self {
            self.answers
                .insert(catalog::sql(name), Err(message.to_string()));
            self
        }
    }

    impl CatalogSession for FakeSession {
        fn probe(&mut self) -> Result<(), QueryError> {
            match &self.probe_error {
                Some(msg) => Err(QueryError::database("ORA-12541", msg.clone())),
                None => Ok(()),
            }
        }

        fn run_statement(&mut self, sql: &str) -> Result<(), QueryError> {
            self.statements.push(sql.to_string());
            if self.drop_after == Some(0) {
                return Err(QueryError::database("ORA-12541", "TNS:no listener"));
            }
            match &self.statement_error {
                Some(msg) => Err(QueryError::database("ORA-65040", msg.clone())),
                None => Ok(()),
            }
        }

        fn query(&mut self, sql: &str) -> Result<ResultSet, QueryError> {
            self.queries.push(sql.to_string());
            if self.drop_after.is_some_and(|n| self.queries.len() > n) {
                return Err(QueryError::database("ORA-12541", "TNS:no listener"));
            }
            match self.answers.get(sql) {
                Some(Ok(rows)) => Ok(rows.clone()),
                Some(Err(msg)) => Err(QueryError::database("ORA-00942", msg.clone())),
                None => Ok(ResultSet::empty()),
            }
        }
    }
}
