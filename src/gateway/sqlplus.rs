use std::fmt::Write as _;
use std::time::Duration;

use crate::catalog;
use crate::core::ResultSet;
use crate::platform::{self, CommandRunOptions, RunError};

use super::{CatalogSession, QueryError, csv};

/// Connection target for an easy-connect string (`//host:port/service`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub service: String,
    pub user: String,
    pub password: String,
}

impl ConnectParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host is empty".to_string());
        }
        if self.service.trim().is_empty() {
            return Err("service name is empty".to_string());
        }
        for (what, value) in [("host", &self.host), ("service name", &self.service)] {
            if value
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '@' | '"'))
            {
                return Err(format!("{what} contains unsupported characters: {value:?}"));
            }
        }
        if self.user.trim().is_empty() {
            return Err("user is empty".to_string());
        }
        if self
            .user
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '@' | '"'))
        {
            return Err(format!("user name contains unsupported characters: {}", self.user));
        }
        if self.password.is_empty() {
            return Err("password is empty".to_string());
        }
        if self.password.contains(['"', '\n', '\r']) {
            return Err("password must not contain double quotes or line breaks".to_string());
        }
        Ok(())
    }

    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.service)
    }
}

/// Runs every statement in a fresh `sqlplus -S -L /nolog` process with the script on
/// stdin, so credentials never reach the command line. Context statements that
/// succeeded are replayed in each later process.
#[derive(Debug, Clone)]
pub struct SqlPlusSession {
    program: String,
    params: ConnectParams,
    timeout: Duration,
    context: Vec<String>,
}

impl SqlPlusSession {
    pub fn new(program: impl Into<String>, params: ConnectParams, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            params,
            timeout,
            context: Vec::new(),
        }
    }

    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    fn script(&self, statement: &str) -> String {
        let p = &self.params;
        let mut s = String::new();
        let _ = writeln!(s, "WHENEVER SQLERROR EXIT SQL.SQLCODE");
        let _ = writeln!(s, "WHENEVER OSERROR EXIT FAILURE");
        let _ = writeln!(
            s,
            "CONNECT {}/\"{}\"@//{}:{}/{}",
            p.user, p.password, p.host, p.port, p.service
        );
        for line in [
            "SET MARKUP CSV ON QUOTE ON",
            "SET DEFINE OFF",
            "SET HEADING ON",
            "SET PAGESIZE 50000",
            "SET FEEDBACK OFF",
            "SET VERIFY OFF",
            "SET ECHO OFF",
        ] {
            let _ = writeln!(s, "{line}");
        }
        let _ = writeln!(s, "ALTER SESSION SET NLS_NUMERIC_CHARACTERS = '.,';");
        for ctx in &self.context {
            let _ = writeln!(s, "{};", terminate(ctx));
        }
        let _ = writeln!(s, "{};", terminate(statement));
        let _ = writeln!(s, "EXIT");
        s
    }

    fn execute(&self, statement: &str) -> Result<String, QueryError> {
        tracing::trace!(program = %self.program, target = %self.params.target(), statement, "sqlplus");
        let out = platform::run_command_with_options(
            &self.program,
            &["-S", "-L", "/nolog"],
            self.timeout,
            &CommandRunOptions {
                env: vec![(
                    "NLS_LANG".to_string(),
                    "AMERICAN_AMERICA.AL32UTF8".to_string(),
                )],
                stdin: Some(self.script(statement)),
            },
        )
        .map_err(|err| match err {
            RunError::Timeout { timeout, .. } => QueryError::Timeout(timeout),
            RunError::Spawn { cmd, source } | RunError::Wait { cmd, source } => {
                QueryError::Launch {
                    program: cmd,
                    source,
                }
            }
        })?;

        if let Some(err) = csv::find_error(&out.stdout) {
            return Err(err);
        }
        if out.exit_code != 0 {
            let stderr = out.stderr.trim();
            return Err(QueryError::database(
                format!("exit code {}", out.exit_code),
                if stderr.is_empty() {
                    "sqlplus reported an error".to_string()
                } else {
                    stderr.to_string()
                },
            ));
        }
        Ok(out.stdout)
    }
}

fn terminate(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

impl CatalogSession for SqlPlusSession {
    fn probe(&mut self) -> Result<(), QueryError> {
        let rows = self.query(catalog::PROBE)?;
        if rows.is_empty() {
            return Err(QueryError::Output(
                "connectivity probe returned no rows".to_string(),
            ));
        }
        Ok(())
    }

    fn run_statement(&mut self, sql: &str) -> Result<(), QueryError> {
        self.execute(sql)?;
        self.context.push(terminate(sql).to_string());
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet, QueryError> {
        let stdout = self.execute(sql)?;
        csv::parse_output(&stdout)
    }
}
