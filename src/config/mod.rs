use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::catalog::{self, CheckGroup};
use crate::gateway::ConnectParams;

pub const DEFAULT_PORT: u16 = 1521;
pub const PASSWORD_ENV: &str = "ORAVERIFY_PASSWORD";
const MASK: &str = "********";

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub gateway: GatewayConfig,
    pub checks: ChecksConfig,
    pub report: ReportConfig,
    pub logs: LogsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    pub profiles: BTreeMap<String, Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayConfig {
    pub sqlplus: String,
    pub root_container: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecksConfig {
    pub groups: Vec<CheckGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub show_remediation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsConfig {
    pub enabled: bool,
}

/// A saved connection target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub service_name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_enabled() -> bool {
    true
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 50,
            },
            gateway: GatewayConfig {
                sqlplus: "sqlplus".to_string(),
                root_container: true,
            },
            checks: ChecksConfig {
                groups: CheckGroup::ALL.to_vec(),
            },
            report: ReportConfig {
                show_remediation: true,
            },
            logs: LogsConfig { enabled: true },
            default_profile: None,
            profiles: BTreeMap::new(),
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    gateway: Option<RawGatewayConfig>,
    checks: Option<RawChecksConfig>,
    report: Option<RawReportConfig>,
    logs: Option<RawLogsConfig>,
    default_profile: Option<String>,
    #[serde(default)]
    profiles: BTreeMap<String, Profile>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawGatewayConfig {
    sqlplus: Option<String>,
    root_container: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawChecksConfig {
    groups: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawReportConfig {
    show_remediation: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawLogsConfig {
    enabled: Option<bool>,
}

pub fn config_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/oraverify")
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    config_dir(home_dir).join("config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let explicit = config_path.is_some();
    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s)
            .with_context(|| format!("failed to parse config file (TOML): {}", path.display()))?;
        apply_raw_config(&mut cfg, raw)?;
        cfg.config_path = Some(path.display().to_string());
    } else if explicit {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) -> Result<()> {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(gateway) = raw.gateway {
        if let Some(sqlplus) = gateway.sqlplus.filter(|s| !s.trim().is_empty()) {
            cfg.gateway.sqlplus = sqlplus;
        }
        if let Some(root_container) = gateway.root_container {
            cfg.gateway.root_container = root_container;
        }
    }

    if let Some(groups) = raw.checks.and_then(|c| c.groups) {
        cfg.checks.groups = catalog::parse_groups(&groups.join(","))
            .map_err(anyhow::Error::msg)
            .context("checks.groups")?;
    }

    if let Some(report) = raw.report {
        if let Some(show_remediation) = report.show_remediation {
            cfg.report.show_remediation = show_remediation;
        }
    }

    if let Some(enabled) = raw.logs.and_then(|l| l.enabled) {
        cfg.logs.enabled = enabled;
    }

    if let Some(name) = raw.default_profile {
        if !raw.profiles.contains_key(&name) {
            return Err(anyhow!("default_profile refers to an unknown profile: {name}"));
        }
        cfg.default_profile = Some(name);
    }
    cfg.profiles = raw.profiles;
    Ok(())
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("ORAVERIFY_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "ORAVERIFY_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("ORAVERIFY_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "ORAVERIFY_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("ORAVERIFY_GATEWAY_SQLPLUS") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.gateway.sqlplus = v.to_string();
        }
    }
    if let Ok(v) = std::env::var("ORAVERIFY_GATEWAY_ROOT_CONTAINER") {
        cfg.gateway.root_container =
            parse_bool(&v).with_context(|| "ORAVERIFY_GATEWAY_ROOT_CONTAINER")?;
    }
    if let Ok(v) = std::env::var("ORAVERIFY_CHECKS_GROUPS") {
        cfg.checks.groups = catalog::parse_groups(&v)
            .map_err(anyhow::Error::msg)
            .with_context(|| "ORAVERIFY_CHECKS_GROUPS")?;
    }
    if let Ok(v) = std::env::var("ORAVERIFY_REPORT_SHOW_REMEDIATION") {
        cfg.report.show_remediation =
            parse_bool(&v).with_context(|| "ORAVERIFY_REPORT_SHOW_REMEDIATION")?;
    }
    if let Ok(v) = std::env::var("ORAVERIFY_LOGS_ENABLED") {
        cfg.logs.enabled = parse_bool(&v).with_context(|| "ORAVERIFY_LOGS_ENABLED")?;
    }
    if let Ok(v) = std::env::var("ORAVERIFY_PROFILE") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.default_profile = Some(v.to_string());
        }
    }

    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}

/// Connection settings given on the command line. Each one overrides the profile.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub profile: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub service: Option<String>,
    pub user: Option<String>,
    pub password_env: Option<String>,
}

impl EffectiveConfig {
    /// Copy with every stored password replaced, for display.
    pub fn masked(&self) -> Self {
        let mut out = self.clone();
        for profile in out.profiles.values_mut() {
            if profile.password.is_some() {
                profile.password = Some(MASK.to_string());
            }
        }
        out
    }

    /// Profile picked by `--profile`, then `ORAVERIFY_PROFILE` or `default_profile`,
    /// then the only enabled profile if there is exactly one.
    pub fn select_profile(&self, requested: Option<&str>) -> Result<Option<(&str, &Profile)>> {
        let name = requested.map(str::to_string).or_else(|| self.default_profile.clone());
        if let Some(name) = name {
            let (key, profile) = self
                .profiles
                .get_key_value(name.as_str())
                .ok_or_else(|| anyhow!("unknown profile: {name}"))?;
            if !profile.enabled {
                return Err(anyhow!("profile is disabled: {name}"));
            }
            return Ok(Some((key.as_str(), profile)));
        }

        let mut enabled = self.profiles.iter().filter(|(_, p)| p.enabled);
        match (enabled.next(), enabled.next()) {
            (Some((k, p)), None) => Ok(Some((k.as_str(), p))),
            _ => Ok(None),
        }
    }

    pub fn resolve_connection(&self, overrides: &ConnectionOverrides) -> Result<ConnectParams> {
        self.resolve_connection_with(overrides, |k| std::env::var(k).ok())
    }

    /// Merges profile and flags into connection parameters. The password comes from
    /// `--password-env`, then the profile's `password_env`, then its `password`,
    /// then `ORAVERIFY_PASSWORD`.
    pub fn resolve_connection_with(
        &self,
        overrides: &ConnectionOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ConnectParams> {
        let profile = self
            .select_profile(overrides.profile.as_deref())?
            .map(|(_, p)| p);

        let pick = |flag: &Option<String>, from_profile: Option<&String>, what: &str| {
            flag.clone()
                .or_else(|| from_profile.cloned())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| anyhow!("no {what} given (use a profile or --{what})"))
        };

        let host = pick(&overrides.host, profile.map(|p| &p.hostname), "host")?;
        let service = pick(&overrides.service, profile.map(|p| &p.service_name), "service")?;
        let user = pick(&overrides.user, profile.map(|p| &p.username), "user")?;
        let port = overrides
            .port
            .or(profile.map(|p| p.port))
            .unwrap_or(DEFAULT_PORT);

        let password = if let Some(var) = &overrides.password_env {
            env(var).ok_or_else(|| anyhow!("environment variable {var} is not set"))?
        } else if let Some(var) = profile.and_then(|p| p.password_env.as_ref()) {
            env(var).ok_or_else(|| anyhow!("environment variable {var} is not set"))?
        } else if let Some(pw) = profile.and_then(|p| p.password.clone()) {
            pw
        } else {
            env(PASSWORD_ENV).ok_or_else(|| {
                anyhow!("no password given (set {PASSWORD_ENV}, --password-env, or a profile password)")
            })?
        };

        let params = ConnectParams {
            host,
            port,
            service,
            user,
            password,
        };
        params.validate().map_err(anyhow::Error::msg)?;
        Ok(params)
    }
}
