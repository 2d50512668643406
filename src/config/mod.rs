//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    BuildArgs, CliArgs, Command, CommentArgs, ContentOverrides, LoggingOverrides, ServeArgs,
    ServeOverrides, SiteOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "lectern";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DATASET: &str = "production";
const DEFAULT_API_VERSION: &str = "2021-10-21";
const DEFAULT_SITE_TITLE: &str = "Lectern";
const DEFAULT_REVALIDATE_SECS: u64 = 86_400;
const DEFAULT_OUTPUT_DIR: &str = "out";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    /// Absent until a project id is configured.
    pub content: Option<ContentSettings>,
    pub site: SiteSettings,
    pub build: BuildSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSettings {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    pub token: Option<String>,
    pub base_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub timezone: Tz,
    pub revalidate: Duration,
    pub prerender: bool,
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub output_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("LECTERN").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Build(args)) => raw.apply_build_overrides(args),
        Some(Command::Comment(args)) => raw.apply_logging_overrides(&args.logging),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    site: RawSiteSettings,
    build: RawBuildSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(prerender) = overrides.prerender {
            self.site.prerender = Some(prerender);
        }
        self.apply_logging_overrides(&overrides.logging);
        self.apply_content_overrides(&overrides.content);
        self.apply_site_overrides(&overrides.site);
    }

    fn apply_build_overrides(&mut self, args: &BuildArgs) {
        if let Some(dir) = args.output_dir.as_ref() {
            self.build.output_dir = Some(dir.clone());
        }
        self.apply_logging_overrides(&args.logging);
        self.apply_content_overrides(&args.content);
        self.apply_site_overrides(&args.site);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(project_id) = overrides.project_id.as_ref() {
            self.content.project_id = Some(project_id.clone());
        }
        if let Some(dataset) = overrides.dataset.as_ref() {
            self.content.dataset = Some(dataset.clone());
        }
        if let Some(version) = overrides.api_version.as_ref() {
            self.content.api_version = Some(version.clone());
        }
        if let Some(use_cdn) = overrides.use_cdn {
            self.content.use_cdn = Some(use_cdn);
        }
        if let Some(token) = overrides.token.as_ref() {
            self.content.token = Some(token.clone());
        }
        if let Some(base_url) = overrides.base_url.as_ref() {
            self.content.base_url = Some(base_url.clone());
        }
    }

    fn apply_site_overrides(&mut self, overrides: &SiteOverrides) {
        if let Some(title) = overrides.title.as_ref() {
            self.site.title = Some(title.clone());
        }
        if let Some(timezone) = overrides.timezone.as_ref() {
            self.site.timezone = Some(timezone.clone());
        }
        if let Some(seconds) = overrides.revalidate_seconds {
            self.site.revalidate_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            site,
            build,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            content: build_content_settings(content)?,
            site: build_site_settings(site)?,
            build: build_build_settings(build)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(
    content: RawContentSettings,
) -> Result<Option<ContentSettings>, LoadError> {
    let Some(project_id) = non_empty(content.project_id) else {
        return Ok(None);
    };
    if !project_id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
    {
        return Err(LoadError::invalid(
            "content.project_id",
            "must contain only letters, digits and dashes",
        ));
    }

    let dataset = non_empty(content.dataset).unwrap_or_else(|| DEFAULT_DATASET.to_string());
    let api_version = non_empty(content.api_version)
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
        .trim_start_matches('v')
        .to_string();

    let base_url = match non_empty(content.base_url) {
        Some(value) => {
            let mut url = Url::parse(&value).map_err(|err| {
                LoadError::invalid("content.base_url", format!("failed to parse: {err}"))
            })?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            Some(url)
        }
        None => None,
    };

    Ok(Some(ContentSettings {
        project_id,
        dataset,
        api_version,
        use_cdn: content.use_cdn.unwrap_or(false),
        token: non_empty(content.token),
        base_url,
    }))
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let title = non_empty(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

    let timezone = match non_empty(site.timezone) {
        Some(name) => Tz::from_str(&name).map_err(|err| {
            LoadError::invalid("site.timezone", format!("unknown timezone `{name}`: {err}"))
        })?,
        None => Tz::UTC,
    };

    let revalidate_seconds = site.revalidate_seconds.unwrap_or(DEFAULT_REVALIDATE_SECS);
    if revalidate_seconds == 0 {
        return Err(LoadError::invalid(
            "site.revalidate_seconds",
            "must be greater than zero",
        ));
    }

    Ok(SiteSettings {
        title,
        timezone,
        revalidate: Duration::from_secs(revalidate_seconds),
        prerender: site.prerender.unwrap_or(false),
    })
}

fn build_build_settings(build: RawBuildSettings) -> Result<BuildSettings, LoadError> {
    let output_dir = build
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if output_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "build.output_dir",
            "path must not be empty",
        ));
    }
    Ok(BuildSettings { output_dir })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    project_id: Option<String>,
    dataset: Option<String>,
    api_version: Option<String>,
    use_cdn: Option<bool>,
    token: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    timezone: Option<String>,
    revalidate_seconds: Option<u64>,
    prerender: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBuildSettings {
    output_dir: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
