use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;

use crate::catalog::CheckGroup;
use crate::config::{ConnectionOverrides, EffectiveConfig};
use crate::core::{CheckStatus, FindingsReport, QueryName};
use crate::engine::{Engine, EngineOptions, Source, Verification};
use crate::ui::{UiConfig, View};

#[derive(Debug, Parser)]
#[command(
    name = "oraverify",
    version,
    about = "Verify that an Oracle database is configured for XStream change data capture"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Seconds allowed for each sqlplus invocation.
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the catalog checks and report findings.
    Verify(VerifyArgs),
    /// Connect and print basic database information.
    Ping(PingArgs),
    /// Print raw catalog data.
    Show(ShowArgs),
    /// Print the catalog queries.
    Queries(QueriesArgs),
    /// Print the remediation guide.
    Guide,
    /// List configured connection profiles.
    Profiles,
    /// Interactive terminal dashboard.
    Ui(UiArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub service: Option<String>,
    #[arg(long)]
    pub user: Option<String>,
    /// Name of the environment variable holding the password.
    #[arg(long = "password-env")]
    pub password_env: Option<String>,
}

impl ConnectionArgs {
    fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            profile: self.profile.clone(),
            host: self.host.clone(),
            port: self.port,
            service: self.service.clone(),
            user: self.user.clone(),
            password_env: self.password_env.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[arg(long)]
    pub details: bool,
    #[arg(long)]
    pub markdown: bool,
    /// Write the JSON export to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Write the raw result sets to this file.
    #[arg(long = "save-results")]
    pub save_results: Option<PathBuf>,
    /// Analyze a saved results file instead of connecting.
    #[arg(long = "from-results")]
    pub from_results: Option<PathBuf>,
    /// Comma-separated check groups (database,users,privileges,xstream,tablespaces|all).
    #[arg(long)]
    pub checks: Option<String>,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Args)]
pub struct PingArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(value_enum)]
    pub view: View,
    #[arg(long = "from-results")]
    pub from_results: Option<PathBuf>,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Args)]
pub struct QueriesArgs {
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct UiArgs {
    #[arg(long = "from-results")]
    pub from_results: Option<PathBuf>,
    #[arg(long)]
    pub checks: Option<String>,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::platform::home_dir()?;

    let env_config_path = std::env::var_os("ORAVERIFY_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    crate::trace::init(cli.verbose, stderr_is_tty && cfg.ui.color && !cli.no_color);

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        show_remediation: cfg.report.show_remediation,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let is_ui_mode = matches!(&cli.command, Commands::Ui(_));
    let engine = Engine::new(
        EngineOptions {
            timeout: Duration::from_secs(cli.timeout.max(1)),
            sqlplus: cfg.gateway.sqlplus.clone(),
            root_container: cfg.gateway.root_container,
            write_logs: cfg.logs.enabled,
            show_progress: ui_cfg.stderr_is_tty && !cli.quiet && !cli.json && !is_ui_mode,
        },
        home_dir,
    );

    match cli.command {
        Commands::Verify(args) => {
            let groups = resolve_groups(args.checks.as_deref(), &cfg)?;
            let source = resolve_source(&cfg, args.from_results, &args.connection)?;
            tracing::debug!(source = %source.describe(), ?groups, "verify");

            let v = engine.verify(&source, &groups)?;
            crate::ui::eprint_warnings(&v.warnings, &ui_cfg);

            if let Some(path) = &args.save_results {
                crate::engine::save_results(path, &v.results)?;
                if !ui_cfg.quiet {
                    eprintln!("results saved: {}", path.display());
                }
            }
            if let Some(path) = &args.output {
                write_json_file(path, &v.report)?;
                if !ui_cfg.quiet {
                    eprintln!("report written: {}", path.display());
                }
            }

            if cli.json {
                write_json(&v.report)?;
            } else if args.markdown {
                write_stdout(&format_markdown_report(&v, ui_cfg.show_remediation))?;
            } else {
                crate::ui::print_verification(&v, &ui_cfg, args.details);
            }

            if v.report.has_failures() {
                return Err(crate::exit::checks_failed(v.report.summary.failed));
            }
        }
        Commands::Ping(args) => {
            let source = resolve_source(&cfg, None, &args.connection)?;
            let Source::Live { params, .. } = &source else {
                return Err(crate::exit::invalid_args("ping needs a live connection"));
            };
            let info = engine.ping(params)?;
            if cli.json {
                write_json(&PingJson {
                    target: params.target(),
                    user: &params.user,
                    database: info.as_ref(),
                })?;
            } else {
                crate::ui::print_ping(&source.describe(), info.as_ref(), &ui_cfg);
            }
        }
        Commands::Show(args) => {
            let source = resolve_source(&cfg, args.from_results, &args.connection)?;
            let (results, warnings) = engine.collect(&source, &args.view.queries())?;
            crate::ui::eprint_warnings(&warnings, &ui_cfg);
            if cli.json {
                write_json(&results)?;
            } else {
                crate::ui::print_view(args.view, &results, &ui_cfg);
            }
        }
        Commands::Queries(args) => {
            let only = args
                .name
                .as_deref()
                .map(str::parse::<QueryName>)
                .transpose()
                .map_err(crate::exit::invalid_args)?;
            if cli.json {
                let queries: Vec<QueryJson> = QueryName::ALL
                    .into_iter()
                    .filter(|q| only.is_none_or(|o| o == *q))
                    .map(|name| QueryJson {
                        name,
                        description: crate::catalog::describe(name),
                        sql: crate::catalog::sql(name),
                    })
                    .collect();
                write_json(&queries)?;
            } else {
                crate::ui::print_queries(only, &ui_cfg);
            }
        }
        Commands::Guide => {
            if cli.json {
                write_json(&crate::remediation::guide())?;
            } else {
                crate::ui::print_guide(&ui_cfg);
            }
        }
        Commands::Profiles => {
            if cli.json {
                write_json(&cfg.masked().profiles)?;
            } else {
                crate::ui::print_profiles(&cfg.masked(), &ui_cfg);
            }
        }
        Commands::Ui(args) => {
            if cli.json {
                return Err(crate::exit::invalid_args("ui cannot be combined with --json"));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args(
                    "ui needs a TTY (stdin and stdout)",
                ));
            }
            let groups = resolve_groups(args.checks.as_deref(), &cfg)?;
            let source = resolve_source(&cfg, args.from_results, &args.connection)?;
            crate::tui::run(engine, source, groups, ui_cfg.color)?;
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "oraverify", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                let masked = cfg.masked();
                if cli.json {
                    write_json(&masked)?;
                } else {
                    write_stdout(&toml::to_string_pretty(&masked)?)?;
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `oraverify config --show`");
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct PingJson<'a> {
    target: String,
    user: &'a str,
    database: Option<&'a crate::rules::DatabaseInfo>,
}

#[derive(Serialize)]
struct QueryJson {
    name: QueryName,
    description: &'static str,
    sql: &'static str,
}

fn resolve_groups(flag: Option<&str>, cfg: &EffectiveConfig) -> Result<Vec<CheckGroup>> {
    match flag {
        Some(s) => crate::catalog::parse_groups(s).map_err(crate::exit::invalid_args),
        None => Ok(cfg.checks.groups.clone()),
    }
}

fn resolve_source(
    cfg: &EffectiveConfig,
    from_results: Option<PathBuf>,
    conn: &ConnectionArgs,
) -> Result<Source> {
    if let Some(path) = from_results {
        return Ok(Source::Replay(path));
    }
    let overrides = conn.overrides();
    let profile = cfg
        .select_profile(overrides.profile.as_deref())
        .map_err(crate::exit::invalid_args_err)?
        .map(|(name, _)| name.to_string());
    let params = cfg
        .resolve_connection(&overrides)
        .map_err(crate::exit::invalid_args_err)?;
    Ok(Source::Live { params, profile })
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn write_json_file(path: &Path, report: &FindingsReport) -> Result<()> {
    let mut buf = serde_json::to_vec_pretty(report).context("failed to serialize report")?;
    buf.push(b'\n');
    std::fs::write(path, buf)
        .with_context(|| format!("failed to write report: {}", path.display()))
}

fn write_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(text.as_bytes()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn format_markdown_report(v: &Verification, show_remediation: bool) -> String {
    use std::fmt::Write as _;

    let report = &v.report;
    let mut out = String::new();

    let _ = writeln!(out, "# Oracle XStream configuration report");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Tool version: {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "- Generated: {}", crate::logs::format_ts(v.finished_at));
    let _ = writeln!(out, "- Source: {}", v.source);
    if let Some(ctx) = &v.context {
        let _ = writeln!(
            out,
            "- Container: {} (ID: {})",
            ctx.container_name, ctx.container_id
        );
    }
    let _ = writeln!(out, "- Overall: **{}**", report.overall_label());

    let s = &report.summary;
    let _ = writeln!(out);
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Total | Passed | Failed | Warnings |");
    let _ = writeln!(out, "|---:|---:|---:|---:|");
    let _ = writeln!(
        out,
        "| {} | {} | {} | {} |",
        s.total_checks, s.passed, s.failed, s.warnings
    );

    let rollups = report.by_category();
    if rollups.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "_No checks were evaluated._");
        return out;
    }

    for rollup in rollups {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {} ({})", rollup.category, rollup.status());
        for f in report.findings_in(&rollup.category) {
            let _ = writeln!(out);
            let _ = writeln!(out, "### {} {}", status_marker(f.status), f.check);
            let _ = writeln!(out, "- Status: `{}`", f.status);
            let _ = writeln!(out, "- {}", f.message);
            if let Some(value) = &f.value {
                let _ = writeln!(out, "- Value: `{value}`");
            }
            if show_remediation {
                if let Some(remediation) = &f.remediation {
                    let _ = writeln!(out);
                    write_fenced_code_block(&mut out, "", "sql", remediation);
                }
            }
        }
    }

    out
}

fn status_marker(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "[PASS]",
        CheckStatus::Fail => "[FAIL]",
        CheckStatus::Warning => "[WARN]",
    }
}

fn write_fenced_code_block(out: &mut String, indent: &str, lang: &str, content: &str) {
    use std::fmt::Write as _;

    let _ = writeln!(out, "{indent}```{lang}");
    for line in content.lines() {
        let _ = writeln!(out, "{indent}{line}");
    }
    let _ = writeln!(out, "{indent}```");
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
