use crate::config::{Config, ConfigError};
use std::path::{Path, PathBuf};

/// Directory paths for console state and configuration
///
/// Only `main` should use `dirs::*` to construct this; everything else
/// receives it by parameter so tests can point it at a temp directory.
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    /// Config directory, e.g. ~/.config/cyrepl on Linux
    pub config_dir: PathBuf,

    /// User's home directory; history lives in `~/.cyrepl`
    pub home_dir: PathBuf,
}

impl DirectoryContext {
    /// Create a DirectoryContext from the system directories
    /// This should ONLY be called from main()
    pub fn from_system() -> std::io::Result<Self> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine home directory",
            )
        })?;

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| home_dir.join(".config"))
            .join("cyrepl");

        Ok(Self {
            config_dir,
            home_dir,
        })
    }

    /// Create a DirectoryContext for testing with a temp directory
    pub fn for_testing(temp_dir: &Path) -> Self {
        Self {
            config_dir: temp_dir.join("config"),
            home_dir: temp_dir.join("home"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(Config::FILENAME)
    }

    /// `~/.cyrepl`, the per-user state directory
    pub fn state_dir(&self) -> PathBuf {
        self.home_dir.join(".cyrepl")
    }

    /// History file, honoring the config override.
    pub fn history_path(&self, config: &Config) -> PathBuf {
        config
            .history
            .file
            .clone()
            .unwrap_or_else(|| self.state_dir().join("history"))
    }

    /// Create the state directory owner-only (0700) if it is missing.
    pub fn ensure_state_dir(&self) -> std::io::Result<PathBuf> {
        use std::os::unix::fs::DirBuilderExt;

        let dir = self.state_dir();
        match std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&dir)
        {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(dir),
            Err(e) => Err(e),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist and parse. Otherwise the user config is
    /// used when present and valid, falling back to defaults.
    pub fn load(dir_context: &DirectoryContext, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            tracing::info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        let path = dir_context.config_path();
        if !path.exists() {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        }

        match Self::load_from_file(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }
}
