use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use url::Url;

/// Command-line arguments for the Lectern binary.
#[derive(Debug, Parser)]
#[command(name = "lectern", version, about = "Lectern blog front-end")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LECTERN_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve article pages and the comment endpoint.
    Serve(Box<ServeArgs>),
    /// Render every article to static files.
    Build(BuildArgs),
    /// Submit a comment to a running server through the comment form.
    Comment(CommentArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub site: SiteOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Build every article page before accepting requests.
    #[arg(
        long = "prerender",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub prerender: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub site: SiteOverrides,

    /// Directory the rendered pages are written to.
    #[arg(long = "output-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CommentArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Base URL of the running Lectern server.
    #[arg(long = "site", env = "LECTERN_SITE_URL", value_name = "URL")]
    pub site: Url,

    /// Identifier of the article being commented on.
    #[arg(long = "article-id", value_name = "ID")]
    pub article_id: String,

    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub comment: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the content store project id.
    #[arg(long = "content-project-id", value_name = "ID")]
    pub project_id: Option<String>,

    /// Override the content store dataset.
    #[arg(long = "content-dataset", value_name = "NAME")]
    pub dataset: Option<String>,

    /// Override the content store API version.
    #[arg(long = "content-api-version", value_name = "VERSION")]
    pub api_version: Option<String>,

    /// Toggle the CDN host for reads.
    #[arg(
        long = "content-use-cdn",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub use_cdn: Option<bool>,

    /// Write token used for comment mutations.
    #[arg(
        long = "content-token",
        env = "SANITY_API_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN"
    )]
    pub token: Option<String>,

    /// Override the content store base URL.
    #[arg(long = "content-base-url", value_name = "URL")]
    pub base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SiteOverrides {
    /// Override the site title.
    #[arg(long = "site-title", value_name = "TITLE")]
    pub title: Option<String>,

    /// Override the IANA timezone used for publication dates.
    #[arg(long = "site-timezone", value_name = "TZ")]
    pub timezone: Option<String>,

    /// Override the page revalidation interval.
    #[arg(long = "site-revalidate-seconds", value_name = "SECONDS")]
    pub revalidate_seconds: Option<u64>,
}
