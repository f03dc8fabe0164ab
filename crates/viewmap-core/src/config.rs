use crate::report::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn, Level};

pub const LOCAL_CONFIG_FILE: &str = ".viewmap.toml";
pub const DEFAULT_MANUAL_CURATION: &str = "manual_curation.csv";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for viewmap
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ViewMapConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub curation: CurationConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which files a directory walk picks up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanConfig {
    /// File extensions scanned during directory walks (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Extra exclude globs (gitignore syntax)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Honour .gitignore / .ignore files while walking
    #[serde(default)]
    pub respect_ignore_files: bool,

    /// Parser threads; 0 lets rayon decide
    #[serde(default)]
    pub threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_patterns: Vec::new(),
            respect_ignore_files: false,
            threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurationConfig {
    #[serde(default = "default_manual_curation")]
    pub manual_curation: PathBuf,

    /// Where suggestions for new curation rows are appended
    #[serde(default)]
    pub suggestions_file: Option<PathBuf>,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            manual_curation: default_manual_curation(),
            suggestions_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub include_unresolved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_manual_curation() -> PathBuf {
    PathBuf::from(DEFAULT_MANUAL_CURATION)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

/// Accepts Python logging names as well, e.g. `WARNING` or `CRITICAL`.
pub fn normalize_log_level(level: &str) -> String {
    match level.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Configuration manager
pub struct ConfigManager {
    config: ViewMapConfig,
    config_path: Option<PathBuf>,
    /// Messages from loading, held until a subscriber is installed.
    messages: Vec<(Level, String)>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (explicit path, ./.viewmap.toml, ~/.viewmap/config.toml)
    /// 3. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut messages = Vec::new();
        if let Some(message) = Self::load_dotenv() {
            messages.push(message);
        }

        let (config, config_path) = Self::load_config_file(explicit)?;
        let config = Self::apply_env_overrides(config)?;
        Self::validate_config(&config)?;

        messages.push(match config_path {
            Some(ref path) => (Level::DEBUG, format!("Config file: {}", path.display())),
            None => (
                Level::DEBUG,
                "No config file found, using defaults".to_string(),
            ),
        });

        Ok(Self {
            config,
            config_path,
            messages,
        })
    }

    pub fn from_config(config: ViewMapConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
            messages: Vec::new(),
        })
    }

    fn load_dotenv() -> Option<(Level, String)> {
        if !Path::new(".env").exists() {
            return None;
        }
        Some(match dotenv::from_filename(".env") {
            Ok(_) => (
                Level::INFO,
                "Loaded .env file from current directory".to_string(),
            ),
            Err(e) => (Level::WARN, format!("Failed to load .env file: {}", e)),
        })
    }

    /// Emit the messages collected while loading. Call once logging is set up.
    pub fn log_messages(&self) {
        for (level, message) in &self.messages {
            match *level {
                Level::ERROR | Level::WARN => warn!("{}", message),
                Level::INFO => info!("{}", message),
                _ => debug!("{}", message),
            }
        }
    }

    pub fn messages(&self) -> &[(Level, String)] {
        &self.messages
    }

    fn load_config_file(
        explicit: Option<&Path>,
    ) -> Result<(ViewMapConfig, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            let config = Self::read_toml_file(path)?;
            return Ok((config, Some(path.to_path_buf())));
        }

        let local_config = Path::new(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".viewmap").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((ViewMapConfig::default(), None))
    }

    pub fn read_toml_file(path: &Path) -> Result<ViewMapConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<ViewMapConfig, ConfigError> {
        let mut config: ViewMapConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.logging.level = normalize_log_level(&config.logging.level);
        Ok(config)
    }

    fn apply_env_overrides(config: ViewMapConfig) -> Result<ViewMapConfig, ConfigError> {
        Self::apply_overrides(config, |name| std::env::var(name).ok())
    }

    /// Apply `VIEWMAP_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(
        mut config: ViewMapConfig,
        lookup: F,
    ) -> Result<ViewMapConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("VIEWMAP_MANUAL_CURATION") {
            config.curation.manual_curation = PathBuf::from(path);
        }
        if let Some(path) = lookup("VIEWMAP_SUGGESTIONS_FILE") {
            config.curation.suggestions_file = Some(PathBuf::from(path));
        }
        if let Some(format) = lookup("VIEWMAP_OUTPUT_FORMAT") {
            config.output.format = format
                .parse()
                .map_err(|e: crate::ViewMapError| ConfigError::ValidationError(e.to_string()))?;
        }
        if let Some(level) = lookup("VIEWMAP_LOG_LEVEL") {
            config.logging.level = normalize_log_level(&level);
        }
        if let Some(threads) = lookup("VIEWMAP_THREADS") {
            config.scan.threads = threads.parse().map_err(|_| {
                ConfigError::ValidationError(format!("Invalid VIEWMAP_THREADS: {}", threads))
            })?;
        }
        Ok(config)
    }

    pub fn validate_config(config: &ViewMapConfig) -> Result<(), ConfigError> {
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        if config.scan.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "scan.extensions must list at least one extension".to_string(),
            ));
        }
        if let Some(ext) = config.scan.extensions.iter().find(|e| e.starts_with('.')) {
            return Err(ConfigError::ValidationError(format!(
                "Extension '{}' must be given without the leading dot",
                ext
            )));
        }

        Ok(())
    }

    pub fn config(&self) -> &ViewMapConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
