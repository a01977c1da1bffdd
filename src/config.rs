//! Service configuration.
//!
//! Everything is read from the process environment once at startup (a `.env`
//! file is loaded first if present). The model credential is optional here:
//! a server without it still starts and reports the missing key per request.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

/// Name of the environment variable holding the model credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Settings for the generative model backend.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

/// Top-level server settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub model: ModelSettings,
    /// Holds `questions_short.txt` and `responses.json`.
    pub data_dir: PathBuf,
    /// Transient storage for uploaded files.
    pub upload_dir: PathBuf,
    /// Transport-level request body cap, above the upload limit.
    pub max_body_bytes: usize,
}

impl Settings {
    /// Build settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR is not a valid socket address")?;

        let max_body_bytes = match get("MAX_BODY_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_BODY_BYTES is not a number: {}", raw))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let model = ModelSettings {
            api_key: get(API_KEY_VAR),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: get("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        Ok(Self {
            bind_addr,
            model,
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            max_body_bytes,
        })
    }

    /// Log the effective configuration without leaking the credential.
    pub fn log_summary(&self) {
        info!(
            "Config: bind={} model={} api_base={} data_dir={:?} upload_dir={:?}",
            self.bind_addr,
            self.model.model,
            self.model.api_base,
            self.data_dir,
            self.upload_dir
        );
        if self.model.api_key.is_none() {
            warn!("{} not set; model-backed routes will answer 500", API_KEY_VAR);
        }
    }
}
