use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Prompt painted before the first logical line
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Colorize input and results
    #[serde(default = "default_true")]
    pub highlight: bool,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub inject: InjectConfig,
}

fn default_prompt() -> String {
    "cy# ".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            highlight: true,
            history: HistoryConfig::default(),
            inject: InjectConfig::default(),
        }
    }
}

/// When history entries reach the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPersistence {
    /// Append each entry as soon as it is submitted
    #[default]
    Incremental,
    /// Rewrite the whole file when the console exits
    OnExit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Override for `~/.cyrepl/history`
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default)]
    pub persistence: HistoryPersistence,
}

fn default_max_entries() -> usize {
    1000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            file: None,
            max_entries: default_max_entries(),
            persistence: HistoryPersistence::default(),
        }
    }
}

/// How `-p` loads the agent library into a target process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectConfig {
    /// Helper program invoked as `<command> <pid> <library> <socket>`
    #[serde(default = "default_inject_command")]
    pub command: String,

    /// Shared library the helper loads into the target
    #[serde(default)]
    pub library: Option<PathBuf>,

    /// Directory for the rendezvous socket (default: system temp dir)
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,
}

fn default_inject_command() -> String {
    "cyrepl-inject".to_string()
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            command: default_inject_command(),
            library: None,
            socket_dir: None,
        }
    }
}

impl Config {
    /// The config file name used in the config directory
    pub const FILENAME: &'static str = "config.json";

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // The display engine treats the prompt as one unbroken row prefix
        if self.prompt.contains('\n') {
            return Err(ConfigError::ValidationError(
                "prompt cannot contain a newline".to_string(),
            ));
        }

        if self.history.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "history.max_entries must be greater than 0".to_string(),
            ));
        }

        if self.inject.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "inject.command cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
