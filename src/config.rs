use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{validate_duration, AspectRatio, GenerationRequest, Resolution};

/// Configuration for the video generation client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Backend connection settings
    pub backend: BackendConfig,

    /// Status polling and progress simulation
    pub polling: PollingConfig,

    /// Initial values of the generation form
    pub defaults: FormDefaults,

    /// Logging and download settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the generation API (without trailing slash)
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Serve fabricated responses instead of calling the backend.
    /// Development only.
    pub mock_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between the end of one status check and the next
    pub interval_ms: u64,

    /// Status checks allowed before giving up
    pub max_attempts: u32,

    /// Period of the cosmetic progress timer
    pub progress_tick_ms: u64,

    /// Cosmetic progress never passes this value before completion
    pub progress_cap: f64,

    /// Upper bound of the random increment per progress tick
    pub progress_max_increment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,

    /// Where downloaded videos are written
    pub download_dir: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_seconds: 30,
            mock_mode: false,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            max_attempts: 150, // ~12.5 minutes at 5s spacing
            progress_tick_ms: 5000,
            progress_cap: 95.0,
            progress_max_increment: 2.0,
        }
    }
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Landscape,
            resolution: Resolution::Hd720,
            duration: 8,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            download_dir: PathBuf::from("."),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }
}

impl FormDefaults {
    /// Empty form pre-filled with the configured options
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest::default()
            .with_aspect_ratio(self.aspect_ratio)
            .with_resolution(self.resolution)
            .with_duration(self.duration)
    }
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let mut config = Self::from_file(path)?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let config_paths = ["videogen.toml", "config/videogen.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Read a single TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults with environment variables applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("VIDEOGEN_API_BASE_URL") {
            self.backend.base_url = base_url;
        }

        if let Ok(mock) = std::env::var("VIDEOGEN_MOCK_MODE") {
            self.backend.mock_mode = matches!(mock.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(interval) = std::env::var("VIDEOGEN_POLL_INTERVAL_MS") {
            match interval.parse() {
                Ok(ms) => self.polling.interval_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid VIDEOGEN_POLL_INTERVAL_MS: {}", interval),
            }
        }

        if let Ok(attempts) = std::env::var("VIDEOGEN_MAX_POLL_ATTEMPTS") {
            match attempts.parse() {
                Ok(n) => self.polling.max_attempts = n,
                Err(_) => tracing::warn!("Ignoring invalid VIDEOGEN_MAX_POLL_ATTEMPTS: {}", attempts),
            }
        }

        if let Ok(log_level) = std::env::var("VIDEOGEN_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend.base_url)
            .map_err(|e| anyhow!("Invalid backend base_url {}: {}", self.backend.base_url, e))?;

        if self.backend.timeout_seconds == 0 {
            return Err(anyhow!("timeout_seconds must be greater than 0"));
        }

        if self.polling.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be greater than 0"));
        }

        if self.polling.interval_ms == 0 || self.polling.progress_tick_ms == 0 {
            return Err(anyhow!("polling intervals must be greater than 0"));
        }

        if !(self.polling.progress_cap > 0.0 && self.polling.progress_cap < 100.0) {
            return Err(anyhow!("progress_cap must be between 0 and 100"));
        }

        if self.polling.progress_max_increment <= 0.0 {
            return Err(anyhow!("progress_max_increment must be positive"));
        }

        validate_duration(self.defaults.duration).map_err(|e| anyhow!("Invalid default duration: {}", e))?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Generation Client Configuration:\n\
            - Backend: {}{}\n\
            - Poll Interval: {}ms\n\
            - Max Poll Attempts: {}\n\
            - Defaults: {} • {} • {}s\n\
            - Download Directory: {}",
            self.backend.base_url,
            if self.backend.mock_mode { " (mock mode)" } else { "" },
            self.polling.interval_ms,
            self.polling.max_attempts,
            self.defaults.resolution,
            self.defaults.aspect_ratio,
            self.defaults.duration,
            self.output.download_dir.display(),
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.backend.base_url = base_url.into();
        self
    }

    pub fn with_mock_mode(mut self, enable: bool) -> Self {
        self.config.backend.mock_mode = enable;
        self
    }

    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.polling.interval_ms = interval_ms;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.polling.max_attempts = max_attempts;
        self
    }

    pub fn with_progress_tick_ms(mut self, tick_ms: u64) -> Self {
        self.config.polling.progress_tick_ms = tick_ms;
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.config.backend.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.download_dir = dir;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
