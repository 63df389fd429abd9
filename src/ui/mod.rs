use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::catalog;
use crate::config::EffectiveConfig;
use crate::core::{CheckStatus, Finding, FindingsReport, QueryName, ResultSet, ResultSetCollection};
use crate::engine::Verification;
use crate::gateway::QueryWarning;
use crate::rules::{ContainerContext, DatabaseInfo};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub show_remediation: bool,
    pub quiet: bool,
    pub verbose: bool,
}

/// Raw data views, one per tab of the data browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum View {
    Users,
    Privileges,
    Xstream,
    Tablespaces,
    Containers,
    All,
}

impl View {
    pub fn sections(self) -> Vec<(&'static str, QueryName)> {
        let users = [("Users", QueryName::UsersCheck)];
        let privileges = [
            ("System privileges", QueryName::UserPrivileges),
            ("Roles", QueryName::UserRoles),
        ];
        let xstream = [
            ("Outbound servers", QueryName::XstreamOutbound),
            ("Capture processes", QueryName::XstreamCapture),
            ("Capture statistics", QueryName::XstreamCaptureStats),
            ("Queues", QueryName::Queues),
        ];
        let tablespaces = [
            ("Tablespaces", QueryName::Tablespaces),
            ("Tablespace size", QueryName::TablespaceSize),
            ("Quotas", QueryName::UserQuotas),
        ];
        let containers = [
            ("Current container", QueryName::CurrentContainer),
            ("Containers", QueryName::Containers),
        ];
        match self {
            View::Users => users.to_vec(),
            View::Privileges => privileges.to_vec(),
            View::Xstream => xstream.to_vec(),
            View::Tablespaces => tablespaces.to_vec(),
            View::Containers => containers.to_vec(),
            View::All => [
                &users[..],
                &privileges[..],
                &xstream[..],
                &tablespaces[..],
                &containers[..],
            ]
            .concat(),
        }
    }

    pub fn queries(self) -> Vec<QueryName> {
        self.sections().into_iter().map(|(_, q)| q).collect()
    }
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    if crate::exit::code_of(err) == crate::exit::ExitCode::ChecksFailed {
        let _ = writeln!(stderr, "verification failed: {err}");
        return;
    }

    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - re-run with `--verbose` for diagnostics");
    let _ = writeln!(
        stderr,
        "  - see `oraverify --help` for commands and options"
    );
}

pub fn eprint_warnings(warnings: &[QueryWarning], cfg: &UiConfig) {
    if cfg.quiet || warnings.is_empty() {
        return;
    }
    let mut stderr = io::stderr().lock();
    for w in warnings {
        let _ = writeln!(stderr, "warning: {}", w.message);
    }
}

pub fn print_verification(v: &Verification, cfg: &UiConfig, details: bool) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_dashboard(&mut out, &v.report, v.context.as_ref(), &v.source, cfg.color);
    if details {
        let _ = writeln!(out);
        write_details(&mut out, &v.report, cfg.color, cfg.show_remediation);
    } else if v.report.summary.failed > 0 || v.report.summary.warnings > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Issues:");
        for f in v
            .report
            .details
            .iter()
            .filter(|f| f.status != CheckStatus::Pass)
        {
            let _ = writeln!(
                out,
                "- [{}] {}: {}",
                format_status(f.status, cfg.color),
                f.check,
                f.message
            );
        }
        let _ = writeln!(out, "Run with `--details` for values and remediation.");
    }
    if cfg.verbose {
        if let Some(path) = &v.log_path {
            let _ = writeln!(out, "\nlog: {}", path.display());
        }
    }
}

pub fn write_dashboard(
    out: &mut dyn Write,
    report: &FindingsReport,
    context: Option<&ContainerContext>,
    source: &str,
    color: bool,
) {
    let _ = writeln!(out, "Source: {source}");
    if let Some(ctx) = context {
        let _ = writeln!(
            out,
            "Container: {} (ID: {})",
            ctx.container_name, ctx.container_id
        );
    }

    let s = &report.summary;
    let _ = writeln!(
        out,
        "Checks: {}  Passed: {}  Failed: {}  Warnings: {}",
        s.total_checks, s.passed, s.failed, s.warnings
    );

    let overall = paint(report.overall_label(), status_color(report.overall_status()), color);
    let detail = match report.overall_status() {
        CheckStatus::Pass => "database is correctly configured".to_string(),
        CheckStatus::Warning => format!("{} warning(s)", s.warnings),
        CheckStatus::Fail => format!("{} critical issue(s)", s.failed),
    };
    let _ = writeln!(out, "Overall: {overall} - {detail}");

    let rollups = report.by_category();
    if rollups.is_empty() {
        let _ = writeln!(out, "\nNo checks were evaluated.");
        return;
    }

    let _ = writeln!(out);
    let cat_w = rollups
        .iter()
        .map(|r| visible_width_ansi(&r.category))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi("Category"));
    let _ = writeln!(
        out,
        "{}  {}  PASS  FAIL  WARN",
        pad_end_display("Category", cat_w),
        pad_end_display("Status", 7)
    );
    let _ = writeln!(out, "{}  -------  ----  ----  ----", "-".repeat(cat_w));
    for r in rollups {
        let _ = writeln!(
            out,
            "{}  {}  {:>4}  {:>4}  {:>4}",
            pad_end_display(&r.category, cat_w),
            pad_end_display(&format_status(r.status(), color), 7),
            r.passed,
            r.failed,
            r.warnings
        );
    }
}

pub fn write_details(out: &mut dyn Write, report: &FindingsReport, color: bool, show_remediation: bool) {
    for rollup in report.by_category() {
        let _ = writeln!(out, "{}:", rollup.category);
        for f in report.findings_in(&rollup.category) {
            write_finding(out, f, color, show_remediation);
        }
    }
}

fn write_finding(out: &mut dyn Write, f: &Finding, color: bool, show_remediation: bool) {
    let _ = writeln!(out, "- [{}] {}", format_status(f.status, color), f.check);
    let _ = writeln!(out, "  {}", f.message);
    if let Some(value) = &f.value {
        let _ = writeln!(out, "  value: {value}");
    }
    if show_remediation {
        if let Some(remediation) = &f.remediation {
            let _ = writeln!(out, "  remediation:");
            for line in remediation.lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
}

pub fn print_ping(source: &str, info: Option<&DatabaseInfo>, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "Connected: {source}");
    let Some(info) = info else {
        let _ = writeln!(out, "v$database returned no rows");
        return;
    };
    let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
    let _ = writeln!(out, "Database: {}", na(&info.database_name));
    let _ = writeln!(out, "Version: {}", na(&info.version));
    let _ = writeln!(out, "CDB: {}", na(&info.cdb));
    let _ = writeln!(out, "Log mode: {}", na(&info.log_mode));
    let _ = writeln!(
        out,
        "Supplemental logging: MIN: {}, ALL: {}",
        info.supplemental_min, info.supplemental_all
    );
}

pub fn print_view(view: View, results: &ResultSetCollection, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_sections(&mut out, &view.sections(), results, cfg.max_table_rows);
}

pub fn write_sections(
    out: &mut dyn Write,
    sections: &[(&str, QueryName)],
    results: &ResultSetCollection,
    max_rows: usize,
) {
    for (idx, (title, name)) in sections.iter().enumerate() {
        if idx > 0 {
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "{title} ({name}):");
        match results.get(*name) {
            None => {
                let _ = writeln!(out, "  (not collected)");
            }
            Some(rs) if rs.is_empty() => {
                let _ = writeln!(out, "  (no rows)");
            }
            Some(rs) => write_table(out, rs, max_rows),
        }
    }
}

/// Width-aligned table of a result set, truncated to `max_rows` rows.
pub fn write_table(out: &mut dyn Write, rs: &ResultSet, max_rows: usize) {
    const MAX_CELL: usize = 48;

    let rows = rs.rows.len().min(max_rows.max(1));
    let cells: Vec<Vec<String>> = rs
        .rows
        .iter()
        .take(rows)
        .map(|row| {
            rs.columns
                .iter()
                .map(|c| truncate_middle(&row.text(c).unwrap_or_default().replace('\n', " "), MAX_CELL))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = rs
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| visible_width_ansi(&r[i]))
                .max()
                .unwrap_or(0)
                .max(visible_width_ansi(c))
        })
        .collect();

    let header: Vec<String> = rs
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| pad_end_display(c, *w))
        .collect();
    let _ = writeln!(out, "  {}", header.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "  {}", rule.join("  "));
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| pad_end_display(v, *w))
            .collect();
        let _ = writeln!(out, "  {}", line.join("  ").trim_end());
    }
    if rs.rows.len() > rows {
        let _ = writeln!(out, "  ... ({} more rows)", rs.rows.len() - rows);
    }
}

pub fn print_guide(cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "Remediation guide");
    write_guide(&mut out);
}

pub fn write_guide(out: &mut dyn Write) {
    for section in crate::remediation::guide() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", section.title);
        let _ = writeln!(out, "{}", section.summary);
        let _ = writeln!(out);
        for line in section.sql.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
}

pub fn print_queries(only: Option<QueryName>, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    if only.is_none() {
        let _ = writeln!(out, "-- context: {};", catalog::SET_ROOT_CONTAINER);
    }
    for name in QueryName::ALL
        .into_iter()
        .filter(|q| only.is_none_or(|o| o == *q))
    {
        let _ = writeln!(out);
        let _ = writeln!(out, "-- {name}: {}", catalog::describe(name));
        let _ = writeln!(out, "{};", catalog::sql(name));
    }
}

pub fn print_profiles(cfg: &EffectiveConfig, ui: &UiConfig) {
    if ui.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    if cfg.profiles.is_empty() {
        let _ = writeln!(out, "No profiles configured.");
        return;
    }
    for (name, p) in &cfg.profiles {
        let default = if cfg.default_profile.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        let disabled = if p.enabled { "" } else { " [disabled]" };
        let _ = writeln!(
            out,
            "- {name}{default}{disabled}: {}@{}:{}/{}",
            p.username, p.hostname, p.port, p.service_name
        );
        if !p.description.is_empty() {
            let _ = writeln!(out, "  {}", p.description);
        }
    }
}

pub fn status_color(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "32",
        CheckStatus::Fail => "31",
        CheckStatus::Warning => "33",
    }
}

pub fn format_status(status: CheckStatus, color: bool) -> String {
    paint(status.as_str(), status_color(status), color)
}

fn paint(s: &str, code: &str, color: bool) -> String {
    if !color {
        return s.to_string();
    }
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s.chars().skip(len - right).collect();

    format!("{prefix}...{suffix}")
}

fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}
