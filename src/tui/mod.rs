use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};

use crate::catalog::CheckGroup;
use crate::core::{CheckStatus, Finding, FindingsReport, QueryName};
use crate::engine::{Engine, Source, Verification};
use crate::ui::View;

/// File written by `s`, relative to the working directory.
pub const EXPORT_FILE: &str = "oracle_config_verification.json";

const RUN_DEADLINE: Duration = Duration::from_secs(600);
const TABLE_ROWS: usize = 200;

pub fn run(engine: Engine, source: Source, groups: Vec<CheckGroup>, color: bool) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switch to alternate screen")?;

    let mut tui = Tui {
        terminal: Terminal::new(CrosstermBackend::new(stdout)).context("initialize terminal")?,
    };
    tui.terminal.clear().ok();

    let runner = Runner {
        engine,
        source,
        groups,
    };
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        run_app(&mut tui.terminal, runner, color)
    }));

    let _ = tui.terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(res) => res,
        Err(_) => Err(anyhow::anyhow!(
            "panic inside the TUI (terminal state should be restored)"
        )),
    }
}

struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

/// What a background run needs; cloned into the worker thread.
#[derive(Clone)]
struct Runner {
    engine: Engine,
    source: Source,
    groups: Vec<CheckGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Dashboard = 0,
    UsersPrivileges = 1,
    Xstream = 2,
    Details = 3,
    Guide = 4,
}

impl Tab {
    const ALL: [Tab; 5] = [
        Tab::Dashboard,
        Tab::UsersPrivileges,
        Tab::Xstream,
        Tab::Details,
        Tab::Guide,
    ];

    fn title(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::UsersPrivileges => "Users & Privileges",
            Tab::Xstream => "XStream",
            Tab::Details => "Detailed Report",
            Tab::Guide => "Remediation Guide",
        }
    }

    fn next(self) -> Self {
        Tab::ALL[(self as usize + 1) % Tab::ALL.len()]
    }

    fn prev(self) -> Self {
        Tab::ALL[(self as usize + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

struct PendingRun {
    rx: mpsc::Receiver<Result<Verification>>,
    started_at: Instant,
}

struct App {
    color: bool,
    source_label: String,
    tab: Tab,
    help: bool,
    verification: Option<Verification>,
    error: Option<String>,
    notice: Option<String>,
    pending: Option<PendingRun>,
    export_path: PathBuf,
    findings_state: ListState,
    scroll: u16,
    tick: u64,
}

impl App {
    fn new(color: bool, source_label: String, export_path: PathBuf) -> Self {
        Self {
            color,
            source_label,
            tab: Tab::Dashboard,
            help: false,
            verification: None,
            error: None,
            notice: None,
            pending: None,
            export_path,
            findings_state: ListState::default(),
            scroll: 0,
            tick: 0,
        }
    }

    fn set_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.scroll = 0;
        }
    }

    fn move_selection(&mut self, delta: i32) {
        if self.tab == Tab::Details {
            let len = self
                .verification
                .as_ref()
                .map(|v| v.report.details.len())
                .unwrap_or(0);
            move_list_selection(&mut self.findings_state, len, delta);
        } else if delta < 0 {
            self.scroll = self.scroll.saturating_sub(delta.unsigned_abs() as u16);
        } else {
            self.scroll = self.scroll.saturating_add(delta as u16);
        }
    }

    fn finish_run(&mut self, res: Result<Verification>) {
        match res {
            Ok(v) => {
                self.notice = Some(match v.warnings.len() {
                    0 => format!("verification finished: {}", v.report.overall_label()),
                    n => format!(
                        "verification finished: {} ({n} warning(s), see Dashboard)",
                        v.report.overall_label()
                    ),
                });
                self.findings_state
                    .select((!v.report.details.is_empty()).then_some(0));
                self.verification = Some(v);
                self.error = None;
            }
            Err(err) => {
                let chain: Vec<String> = err.chain().map(|c| c.to_string()).collect();
                self.error = Some(chain.join(": "));
            }
        }
    }
}

fn move_list_selection(state: &mut ListState, len: usize, delta: i32) {
    if len == 0 {
        state.select(None);
        return;
    }
    let selected = state.selected().unwrap_or(0) as i32;
    let next = (selected + delta).clamp(0, (len as i32).saturating_sub(1));
    state.select(Some(next as usize));
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runner: Runner,
    color: bool,
) -> Result<()> {
    let mut app = App::new(color, runner.source.describe(), PathBuf::from(EXPORT_FILE));
    start_run(&mut app, &runner);

    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| draw(f, &mut app)).context("draw frame")?;

        if let Some(pending) = app.pending.take() {
            match pending.rx.try_recv() {
                Ok(res) => app.finish_run(res),
                Err(mpsc::TryRecvError::Empty) => {
                    if pending.started_at.elapsed() > RUN_DEADLINE {
                        app.error = Some("timed out waiting for the verification run".to_string());
                    } else {
                        app.pending = Some(pending);
                    }
                }
                Err(mpsc::TryRecvError::Disconnected) => {
                    app.error = Some("verification worker stopped unexpectedly".to_string());
                }
            }
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout).context("poll terminal events")? {
            if let Event::Key(key) = event::read().context("read terminal event")? {
                if key.kind == KeyEventKind::Press {
                    match handle_key(&mut app, key) {
                        KeyOutcome::Quit => return Ok(()),
                        KeyOutcome::Rerun => start_run(&mut app, &runner),
                        KeyOutcome::Continue => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick = app.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Rerun,
    Quit,
}

fn handle_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    if app.help {
        app.help = false;
        return KeyOutcome::Continue;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('?') => app.help = true,
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.set_tab(app.tab.next()),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.set_tab(app.tab.prev()),
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            app.set_tab(Tab::ALL[idx]);
        }
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::PageDown => app.move_selection(10),
        KeyCode::PageUp => app.move_selection(-10),
        KeyCode::Char('r') => {
            if app.pending.is_some() {
                app.notice = Some("a verification run is already in progress".to_string());
            } else {
                return KeyOutcome::Rerun;
            }
        }
        KeyCode::Char('s') => {
            app.notice = Some(match &app.verification {
                None => "nothing to save yet".to_string(),
                Some(v) => match save_export(&app.export_path, &v.report) {
                    Ok(()) => format!("saved {}", app.export_path.display()),
                    Err(err) => format!("save failed: {err:#}"),
                },
            });
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn start_run(app: &mut App, runner: &Runner) {
    let (tx, rx) = mpsc::channel::<Result<Verification>>();
    let runner = runner.clone();
    thread::spawn(move || {
        let res = runner.engine.verify(&runner.source, &runner.groups);
        let _ = tx.send(res);
    });
    app.pending = Some(PendingRun {
        rx,
        started_at: Instant::now(),
    });
    app.error = None;
    app.notice = None;
}

fn save_export(path: &Path, report: &FindingsReport) -> Result<()> {
    let buf = serde_json::to_vec_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, buf).with_context(|| format!("failed to write {}", path.display()))
}

fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    draw_header(f, chunks[0], app);
    draw_tabs(f, chunks[1], app);
    draw_footer(f, chunks[3], app);

    if app.help {
        draw_help(f, chunks[2]);
        return;
    }
    if let Some(err) = &app.error {
        let w = Paragraph::new(err.clone())
            .block(Block::default().borders(Borders::ALL).title("Error"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false });
        f.render_widget(w, chunks[2]);
        return;
    }

    match app.tab {
        Tab::Guide => draw_guide(f, chunks[2], app.scroll),
        _ if app.verification.is_none() => draw_running(f, chunks[2], app),
        Tab::Dashboard => draw_dashboard(f, chunks[2], app),
        Tab::UsersPrivileges => {
            let sections = [View::Users.sections(), View::Privileges.sections()].concat();
            draw_sections(f, chunks[2], app, "Users & Privileges", &sections);
        }
        Tab::Xstream => draw_sections(f, chunks[2], app, "XStream", &View::Xstream.sections()),
        Tab::Details => draw_details(f, chunks[2], app),
    }
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "oraverify",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::raw(app.source_label.clone()),
    ];
    if let Some(ctx) = app.verification.as_ref().and_then(|v| v.context.as_ref()) {
        spans.push(Span::styled(
            format!("  [{} / ID {}]", ctx.container_name, ctx.container_id),
            Style::default().fg(Color::Cyan),
        ));
    }

    let w = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(w, area);
}

fn draw_tabs(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let titles: Vec<String> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{} {}", i + 1, t.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.tab as usize)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let keys = Line::from(Span::styled(
        "Tab/1-5: switch  j/k: move  r: re-run  s: save JSON  ?: help  q: quit",
        Style::default().fg(Color::DarkGray),
    ));
    let status = if app.pending.is_some() {
        let spinner = ["|", "/", "-", "\\"][(app.tick % 4) as usize];
        Line::from(Span::styled(
            format!("{spinner} running verification..."),
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some(notice) = &app.notice {
        Line::from(Span::raw(notice.clone()))
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(Text::from(vec![status, keys])), area);
}

fn draw_running(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let msg = if app.pending.is_some() {
        "Running catalog queries..."
    } else {
        "No results yet. Press r to run the verification."
    };
    let w = Paragraph::new(msg).block(Block::default().borders(Borders::ALL));
    f.render_widget(w, area);
}

fn draw_dashboard(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let Some(v) = app.verification.as_ref() else {
        return;
    };
    let w = Paragraph::new(dashboard_text(v, app.color))
        .block(Block::default().borders(Borders::ALL).title("Dashboard"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(w, area);
}

fn dashboard_text(v: &Verification, color: bool) -> Text<'static> {
    let report = &v.report;
    let s = &report.summary;
    let overall = report.overall_status();
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Overall: "),
            Span::styled(
                report.overall_label(),
                status_style(overall, color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(format!("Total checks: {}", s.total_checks)),
        Line::from(vec![
            Span::raw("Passed: "),
            Span::styled(s.passed.to_string(), status_style(CheckStatus::Pass, color)),
            Span::raw("  Failed: "),
            Span::styled(s.failed.to_string(), status_style(CheckStatus::Fail, color)),
            Span::raw("  Warnings: "),
            Span::styled(
                s.warnings.to_string(),
                status_style(CheckStatus::Warning, color),
            ),
        ]),
        Line::from(""),
    ];

    if !v.warnings.is_empty() {
        for w in &v.warnings {
            lines.push(Line::from(vec![
                Span::styled("warning: ", status_style(CheckStatus::Warning, color)),
                Span::raw(w.message.clone()),
            ]));
        }
        lines.push(Line::from(""));
    }

    let rollups = report.by_category();
    if rollups.is_empty() {
        lines.push(Line::from("No checks were evaluated."));
    }
    for r in rollups {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<8}", r.status().as_str()),
                status_style(r.status(), color),
            ),
            Span::raw(format!(
                "{}  ({} pass, {} fail, {} warn)",
                r.category, r.passed, r.failed, r.warnings
            )),
        ]));
    }

    let issues: Vec<&Finding> = report
        .details
        .iter()
        .filter(|f| f.status != CheckStatus::Pass)
        .collect();
    if !issues.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Issues",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for f in issues {
            lines.push(Line::from(vec![
                Span::styled(format!("[{}] ", f.status), status_style(f.status, color)),
                Span::raw(format!("{}: {}", f.check, f.message)),
            ]));
        }
    }
    Text::from(lines)
}

fn draw_sections(
    f: &mut ratatui::Frame,
    area: Rect,
    app: &App,
    title: &str,
    sections: &[(&str, QueryName)],
) {
    let Some(v) = app.verification.as_ref() else {
        return;
    };
    let text = sections_text(sections, v);
    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .scroll((app.scroll, 0));
    f.render_widget(w, area);
}

fn sections_text(sections: &[(&str, QueryName)], v: &Verification) -> Text<'static> {
    let mut buf = Vec::new();
    crate::ui::write_sections(&mut buf, sections, &v.results, TABLE_ROWS);
    let rendered = String::from_utf8_lossy(&buf).into_owned();
    Text::from(
        rendered
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect::<Vec<_>>(),
    )
}

fn draw_details(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let Some(v) = app.verification.as_ref() else {
        return;
    };
    let color = app.color;
    let report = &v.report;

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let items: Vec<ListItem> = if report.details.is_empty() {
        vec![ListItem::new(Line::from("No findings."))]
    } else {
        report
            .details
            .iter()
            .map(|finding| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<8}", finding.status.as_str()),
                        status_style(finding.status, color),
                    ),
                    Span::raw(finding.check.clone()),
                ]))
            })
            .collect()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Findings ({})", report.details.len())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, body[0], &mut app.findings_state);

    let detail = app
        .findings_state
        .selected()
        .and_then(|idx| report.details.get(idx))
        .map(finding_detail)
        .unwrap_or_else(|| Text::from("No finding selected."));
    let w = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Detail"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, body[1]);
}

fn finding_detail(finding: &Finding) -> Text<'static> {
    let mut lines = vec![
        Line::from(Span::styled(
            finding.check.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Category: {}", finding.category)),
        Line::from(format!("Status: {}", finding.status)),
        Line::from(""),
        Line::from(finding.message.clone()),
    ];
    if let Some(value) = &finding.value {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Value: {value}")));
    }
    if let Some(remediation) = &finding.remediation {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Remediation:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for l in remediation.lines() {
            lines.push(Line::from(Span::styled(
                format!("  {l}"),
                Style::default().fg(Color::Cyan),
            )));
        }
    }
    Text::from(lines)
}

fn draw_guide(f: &mut ratatui::Frame, area: Rect, scroll: u16) {
    let mut buf = Vec::new();
    crate::ui::write_guide(&mut buf);
    let text = String::from_utf8_lossy(&buf).into_owned();
    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Remediation Guide"))
        .scroll((scroll, 0));
    f.render_widget(w, area);
}

fn draw_help(f: &mut ratatui::Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from(Span::styled(
            "oraverify UI",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  Tab / Shift-Tab / h / l : switch tab"),
        Line::from("  1-5                     : jump to tab"),
        Line::from("  j / k / PgUp / PgDn     : move selection or scroll"),
        Line::from("  r                       : re-run the verification"),
        Line::from(format!("  s                       : save the JSON report to {EXPORT_FILE}")),
        Line::from("  q / Esc / Ctrl-C        : quit"),
        Line::from(""),
        Line::from("Any key closes this help."),
    ]);
    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, centered_rect(60, 60, area));
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn status_style(status: CheckStatus, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    match status {
        CheckStatus::Pass => Style::default().fg(Color::Green),
        CheckStatus::Fail => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        CheckStatus::Warning => Style::default().fg(Color::Yellow),
    }
}
