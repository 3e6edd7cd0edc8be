//! Configuration module
//!
//! Runtime settings are read from the environment (and an optional `.env` file).
//! Every value has a default so the tool runs without any configuration in
//! local mode.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::EngineMode;
use crate::models::Preset;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_API_PATH: &str = "/api/optimize";
const HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_QUALITY: u8 = 80;
const MAX_FILE_SIZE_MB: u64 = 50;
const DEFAULT_OUTPUT_DIR: &str = "resized";

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the remote optimizer
    pub api_url: String,
    /// Path of the optimize endpoint on `api_url`
    pub api_path: String,
    pub api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub default_quality: u8,
    pub default_preset: Preset,
    pub default_mode: EngineMode,
    pub output_dir: PathBuf,
    pub max_file_size_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            api_key: None,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            default_quality: DEFAULT_QUALITY,
            default_preset: Preset::Original,
            default_mode: EngineMode::Local,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        tracing::debug!(
            mode = %config.default_mode,
            preset = config.default_preset.as_str(),
            api_url = %config.api_url,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Build a config from any key lookup; used by `from_env` and by tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_mode = match lookup("IMGBATCH_MODE") {
            Some(mode) => mode
                .parse()
                .map_err(|e| anyhow::anyhow!("IMGBATCH_MODE is invalid: {}", e))?,
            None => defaults.default_mode,
        };

        let default_quality = match lookup("IMGBATCH_DEFAULT_QUALITY") {
            Some(q) => q
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("IMGBATCH_DEFAULT_QUALITY must be a number"))?,
            None => defaults.default_quality,
        };

        let http_timeout_secs = match lookup("IMGBATCH_HTTP_TIMEOUT_SECS") {
            Some(secs) => secs
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("IMGBATCH_HTTP_TIMEOUT_SECS must be a number"))?,
            None => defaults.http_timeout_secs,
        };

        let max_file_size_bytes = match lookup("IMGBATCH_MAX_FILE_SIZE_MB") {
            Some(mb) => mb
                .trim()
                .parse::<u64>()
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .ok_or_else(|| anyhow::anyhow!("IMGBATCH_MAX_FILE_SIZE_MB must be a number"))?,
            None => defaults.max_file_size_bytes,
        };

        Ok(Self {
            api_url: lookup("IMGBATCH_API_URL")
                .or_else(|| lookup("API_URL"))
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_path: lookup("IMGBATCH_API_PATH").unwrap_or(defaults.api_path),
            api_key: lookup("IMGBATCH_API_KEY").filter(|s| !s.is_empty()),
            http_timeout_secs,
            default_quality,
            default_preset: lookup("IMGBATCH_DEFAULT_PRESET")
                .map(|s| Preset::from_selector(&s))
                .unwrap_or(defaults.default_preset),
            default_mode,
            output_dir: lookup("IMGBATCH_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            max_file_size_bytes,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "IMGBATCH_API_URL must start with http:// or https://"
            ));
        }

        if !self.api_path.starts_with('/') {
            return Err(anyhow::anyhow!("IMGBATCH_API_PATH must start with '/'"));
        }

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "IMGBATCH_HTTP_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if !(1..=100).contains(&self.default_quality) {
            return Err(anyhow::anyhow!(
                "IMGBATCH_DEFAULT_QUALITY must be between 1 and 100"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("IMGBATCH_MAX_FILE_SIZE_MB must be greater than 0"));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn optimize_url(&self) -> String {
        format!("{}{}", self.api_url, self.api_path)
    }
}
