//! Server configuration.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `HOST`: listen host (default: 0.0.0.0)
//! - `PORT`: listen port (default: 8000)
//! - `NOTES_FILE`: note store path (default: data/notes.json)
//! - `CORS_ORIGINS`: comma-separated allowed origins
//! - `GALAXY_SIMILAR_TOP_K`: default `top_k` for similarity queries (default: 3)

use std::path::PathBuf;

use axum::http::HeaderValue;
use galaxy_core::defaults;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub notes_file: PathBuf,
    pub cors_origins: Vec<String>,
    pub similar_top_k: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            notes_file: PathBuf::from(defaults::NOTES_FILE),
            cors_origins: split_origins(defaults::CORS_ORIGINS),
            similar_top_k: defaults::SIMILAR_TOP_K as i64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(val) = lookup("PORT") {
            match val.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = %val, "Invalid PORT, using default"),
            }
        }
        if let Some(path) = lookup("NOTES_FILE").filter(|p| !p.trim().is_empty()) {
            config.notes_file = PathBuf::from(path.trim());
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            let parsed = split_origins(&origins);
            if !parsed.is_empty() {
                config.cors_origins = parsed;
            }
        }
        if let Some(val) = lookup("GALAXY_SIMILAR_TOP_K") {
            match val.trim().parse::<i64>() {
                Ok(k) => config.similar_top_k = k,
                Err(_) => warn!(value = %val, "Invalid GALAXY_SIMILAR_TOP_K, using default"),
            }
        }

        config
    }

    /// `host:port` for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Origins as header values; invalid entries are skipped with a warning.
    pub fn allowed_origins(&self) -> Vec<HeaderValue> {
        self.cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect()
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
