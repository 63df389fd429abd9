use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::catalog::{self, CheckGroup};
use crate::core::{FindingsReport, QueryName, ResultSetCollection};
use crate::gateway::{
    self, CatalogSession, ConnectParams, ContextSwitch, QueryWarning, SqlPlusSession,
};
use crate::rules::{self, ContainerContext, DatabaseInfo};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub timeout: Duration,
    pub sqlplus: String,
    pub root_container: bool,
    pub write_logs: bool,
    pub show_progress: bool,
}

/// Where the result sets come from.
#[derive(Debug, Clone)]
pub enum Source {
    Live {
        params: ConnectParams,
        profile: Option<String>,
    },
    Replay(PathBuf),
}

impl Source {
    pub fn describe(&self) -> String {
        match self {
            Source::Live { params, .. } => format!("{}@{}", params.user, params.target()),
            Source::Replay(path) => format!("replay of {}", path.display()),
        }
    }
}

/// Everything one verification produced.
#[derive(Debug, Clone)]
pub struct Verification {
    pub report: FindingsReport,
    pub results: ResultSetCollection,
    pub warnings: Vec<QueryWarning>,
    pub context: Option<ContainerContext>,
    pub source: String,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub log_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct Engine {
    opts: EngineOptions,
    home_dir: PathBuf,
}

impl Engine {
    pub fn new(opts: EngineOptions, home_dir: PathBuf) -> Self {
        Self { opts, home_dir }
    }

    pub fn timeout(&self) -> Duration {
        self.opts.timeout
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn session(&self, params: ConnectParams) -> SqlPlusSession {
        SqlPlusSession::new(self.opts.sqlplus.clone(), params, self.opts.timeout)
    }

    /// Opens a session and checks it answers. Failures carry the connectivity exit code.
    pub fn connect(&self, params: &ConnectParams) -> Result<SqlPlusSession> {
        let mut session = self.session(params.clone());
        session.probe().map_err(|err| {
            crate::exit::connection_failed_err(
                anyhow::Error::new(err).context(format!("cannot connect to {}", params.target())),
            )
        })?;
        tracing::info!(target_db = %params.target(), "connected");
        Ok(session)
    }

    pub fn ping(&self, params: &ConnectParams) -> Result<Option<DatabaseInfo>> {
        let mut session = self.connect(params)?;
        let rows = session
            .query(catalog::sql(QueryName::DatabaseInfo))
            .context("reading v$database")?;
        Ok(DatabaseInfo::from_result(&rows))
    }

    pub fn verify(&self, source: &Source, groups: &[CheckGroup]) -> Result<Verification> {
        match source {
            Source::Live { params, profile } => {
                let mut session = self.connect(params)?;
                self.verify_session(&mut session, params, profile.as_deref(), groups)
            }
            Source::Replay(path) => self.replay(path, groups),
        }
    }

    /// Collects raw result sets without analyzing them, for the data views.
    pub fn collect(
        &self,
        source: &Source,
        queries: &[QueryName],
    ) -> Result<(ResultSetCollection, Vec<QueryWarning>)> {
        match source {
            Source::Live { params, .. } => {
                let mut session = self.connect(params)?;
                let mut warnings = Vec::new();
                if self.opts.root_container {
                    let (_, warning) = gateway::enter_root_container(&mut session)
                        .map_err(|err| connection_lost(params, err))?;
                    warnings.extend(warning);
                }
                let batch = gateway::run_batch(&mut session, queries)
                    .map_err(|err| connection_lost(params, err))?;
                warnings.extend(batch.warnings);
                Ok((batch.results, warnings))
            }
            Source::Replay(path) => {
                let all = load_results(path)?;
                let picked = all
                    .iter()
                    .filter(|(name, _)| queries.contains(name))
                    .map(|(name, rows)| (name, rows.clone()))
                    .collect();
                Ok((picked, vec![]))
            }
        }
    }

    /// Runs the batch on an already connected session and analyzes it.
    pub fn verify_session(
        &self,
        session: &mut dyn CatalogSession,
        params: &ConnectParams,
        profile: Option<&str>,
        groups: &[CheckGroup],
    ) -> Result<Verification> {
        let started_at = OffsetDateTime::now_utc();
        let mut warnings = Vec::new();

        let context_switch = if self.opts.root_container {
            let (switch, warning) = gateway::enter_root_container(session)
                .map_err(|err| connection_lost(params, err))?;
            warnings.extend(warning);
            switch
        } else {
            ContextSwitch::Skipped
        };

        let queries = catalog::plan(groups);
        let pb = self.spinner(queries.len());
        let batch = gateway::run_batch_with(session, &queries, |done, _| {
            if let Some(pb) = &pb {
                pb.set_position(done as u64);
            }
        });
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        let batch = batch.map_err(|err| connection_lost(params, err))?;
        warnings.extend(batch.warnings);

        let report = rules::analyze(&batch.results);
        let finished_at = OffsetDateTime::now_utc();

        let log_path = if self.opts.write_logs {
            let group_names: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
            let target = params.target();
            let run = crate::logs::VerifyRun {
                started_at,
                finished_at,
                target: &target,
                user: &params.user,
                profile,
                groups: &group_names,
                context_switch: &context_switch,
                attempts: &batch.attempts,
                warnings: &warnings,
                summary: &report.summary,
                overall: report.overall_status(),
            };
            match crate::logs::write_verify_log(&self.home_dir, &run) {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::warn!(error = %err, "run log not written");
                    None
                }
            }
        } else {
            None
        };

        Ok(Verification {
            context: rules::container_context(&batch.results),
            report,
            results: batch.results,
            warnings,
            source: format!("{}@{}", params.user, params.target()),
            started_at,
            finished_at,
            log_path,
        })
    }

    /// Analyzes a saved collection. Sets outside the selected groups are dropped first,
    /// as if their queries had never run.
    pub fn replay(&self, path: &Path, groups: &[CheckGroup]) -> Result<Verification> {
        let started_at = OffsetDateTime::now_utc();
        let planned = catalog::plan(groups);
        let results: ResultSetCollection = load_results(path)?
            .iter()
            .filter(|(name, _)| planned.contains(name))
            .map(|(name, rows)| (name, rows.clone()))
            .collect();
        let report = rules::analyze(&results);
        Ok(Verification {
            context: rules::container_context(&results),
            report,
            results,
            warnings: vec![],
            source: format!("replay of {}", path.display()),
            started_at,
            finished_at: OffsetDateTime::now_utc(),
            log_path: None,
        })
    }

    fn spinner(&self, total: usize) -> Option<indicatif::ProgressBar> {
        use std::io::IsTerminal;
        if !(self.opts.show_progress && std::io::stderr().is_terminal()) {
            return None;
        }
        let pb = indicatif::ProgressBar::new(total as u64);
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        if let Ok(style) =
            indicatif::ProgressStyle::with_template("{spinner} {msg} [{pos}/{len}]")
        {
            pb.set_style(style);
        }
        pb.set_message("running catalog queries...");
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}

fn connection_lost(params: &ConnectParams, err: gateway::QueryError) -> anyhow::Error {
    crate::exit::connection_failed_err(
        anyhow::Error::new(err).context(format!("lost connection to {}", params.target())),
    )
}

pub fn load_results(path: &Path) -> Result<ResultSetCollection> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read results file: {}", path.display()))?;
    let results: ResultSetCollection = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse results file (JSON): {}", path.display()))?;
    Ok(results)
}

pub fn save_results(path: &Path, results: &ResultSetCollection) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let buf = serde_json::to_vec_pretty(results).context("failed to serialize results")?;
    std::fs::write(path, buf)
        .with_context(|| format!("failed to write results file: {}", path.display()))
}
