use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::api::ResolverConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}', expected pretty or json", other)),
        }
    }
}

/// Runtime settings. Read from the environment at start-up, never written back.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub resolver: ResolverConfig,
    pub download_dir: PathBuf,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            download_dir: default_download_dir(),
            log_format: LogFormat::default(),
        }
    }
}

pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `YTDLP_PATH`, `YTDLP_TIMEOUT_SECS`, `DOWNLOAD_DIR` and `LOG_FORMAT`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("YTDLP_PATH").filter(|p| !p.trim().is_empty()) {
            config.resolver.binary = PathBuf::from(path);
        }

        if let Some(raw) = lookup("YTDLP_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.resolver.timeout = Duration::from_secs(secs),
                _ => warn!("Ignoring invalid YTDLP_TIMEOUT_SECS: {}", raw),
            }
        }

        if let Some(dir) = lookup("DOWNLOAD_DIR").filter(|d| !d.trim().is_empty()) {
            config.download_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("LOG_FORMAT") {
            match raw.parse() {
                Ok(format) => config.log_format = format,
                Err(e) => warn!("{}", e),
            }
        }

        config
    }
}
