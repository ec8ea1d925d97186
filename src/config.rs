//! TOML configuration.
//!
//! Every section is optional; a missing config file yields the defaults.
//!
//! ```toml
//! [engine]
//! command = "x2t"
//! args = []
//! work_dir = "./data/x2t"
//!
//! [picker]
//! accept = [".docx", ".xlsx", ".pptx", ".doc", ".xls", ".ppt", ".csv"]
//! cancel_timeout_ms = 5000
//!
//! [transfer]
//! order = "arrival"          # or "index"
//!
//! [guide]
//! delay_ms = 1000
//! visible_ms = 5000
//! state_path = "./data/ui-state.json"
//!
//! [fetch]
//! timeout_secs = 60
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chunk::ReassemblyOrder;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub picker: PickerConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub guide: GuideConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Converter executable, resolved through `PATH` when not absolute.
    #[serde(default = "default_engine_command")]
    pub command: String,
    /// Arguments placed before the input and output paths.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Extension of the converted output file.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: Vec::new(),
            work_dir: default_work_dir(),
            output_extension: default_output_extension(),
        }
    }
}

fn default_engine_command() -> String {
    "x2t".to_string()
}
fn default_work_dir() -> PathBuf {
    PathBuf::from("./data/x2t")
}
fn default_output_extension() -> String {
    "bin".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PickerConfig {
    #[serde(default = "default_accept")]
    pub accept: Vec<String>,
    #[serde(default = "default_cancel_timeout_ms")]
    pub cancel_timeout_ms: u64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            accept: default_accept(),
            cancel_timeout_ms: default_cancel_timeout_ms(),
        }
    }
}

impl PickerConfig {
    pub fn cancel_timeout(&self) -> Duration {
        Duration::from_millis(self.cancel_timeout_ms)
    }
}

pub fn default_accept() -> Vec<String> {
    [".docx", ".xlsx", ".pptx", ".doc", ".xls", ".ppt", ".csv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_cancel_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TransferConfig {
    #[serde(default)]
    pub order: ReassemblyOrder,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuideConfig {
    #[serde(default = "default_guide_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_guide_visible_ms")]
    pub visible_ms: u64,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_guide_delay_ms(),
            visible_ms: default_guide_visible_ms(),
            state_path: default_state_path(),
        }
    }
}

impl GuideConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn visible_for(&self) -> Duration {
        Duration::from_millis(self.visible_ms)
    }
}

fn default_guide_delay_ms() -> u64 {
    1000
}
fn default_guide_visible_ms() -> u64 {
    5000
}
fn default_state_path() -> PathBuf {
    PathBuf::from("./data/ui-state.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    format!("office-loader/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from `path`. A missing file yields the defaults; an
/// unreadable or invalid file is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.engine.command.trim().is_empty() {
        anyhow::bail!("engine.command must not be empty");
    }
    if config.engine.output_extension.trim().is_empty() {
        anyhow::bail!("engine.output_extension must not be empty");
    }

    if config.picker.accept.is_empty() {
        anyhow::bail!("picker.accept must list at least one extension");
    }
    if let Some(bad) = config.picker.accept.iter().find(|e| !e.starts_with('.')) {
        anyhow::bail!("picker.accept entries must start with '.': '{}'", bad);
    }
    if config.picker.cancel_timeout_ms == 0 {
        anyhow::bail!("picker.cancel_timeout_ms must be > 0");
    }

    if config.guide.visible_ms == 0 {
        anyhow::bail!("guide.visible_ms must be > 0");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    Ok(())
}
