use std::{path::PathBuf, time::Duration};

use clap::Parser;
use serde::Deserialize;

use crate::{commands::Command, error::Result};

const DEFAULT_CONFIG_PATH: &str = "config/tripshare.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub session_file: PathBuf,
    pub log_level: String,
    /// 0 keeps the HTTP client's own default.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            session_file: PathBuf::from("config/tripshare_session.json"),
            log_level: "info".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[derive(Debug, Parser)]
#[command(name = "tripshare", about = "Split trip expenses with your travel group")]
pub struct Args {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override base URL (e.g. http://localhost:8081).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override where the session token is stored.
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
    /// Override log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

pub fn load() -> Result<(AppConfig, Command)> {
    let args = Args::parse();
    let settings = resolve(&args)?;
    Ok((settings, args.command))
}

fn resolve(args: &Args) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("TRIPSHARE"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(session_file) = &args.session_file {
        settings.session_file = session_file.clone();
    }
    if let Some(log_level) = &args.log_level {
        settings.log_level = log_level.clone();
    }

    Ok(settings)
}
