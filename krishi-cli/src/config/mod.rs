//! Configuration file loading.
//!
//! The file is `--config PATH` (or `KRISHI_CONFIG`) when given, otherwise
//! `./krishi.toml` if it exists. Command-line flags override the file.
//!
//! # Example Config File
//!
//! ```toml
//! [llm]
//! max_tokens = 1000
//! timeout_secs = 30
//! temperature = 0.7
//!
//! [engine]
//! max_iterations = 5
//! timeout_secs = 120
//! max_consecutive_tool_failures = 3
//!
//! [router]
//! classification_history_turns = 4
//! answer_history_turns = 5
//!
//! [emitter]
//! chunk_delay_ms = 30
//!
//! [tools]
//! timeout_secs = 30
//! ```

mod types;

pub use types::KrishiConfig;

use std::path::{Path, PathBuf};

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "krishi.toml";

/// Errors that can occur during config loading.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error reading config file
    Io { path: PathBuf, error: String },
    /// Parse error in config file
    Parse { path: PathBuf, error: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(f, "Failed to read {}: {}", path.display(), error)
            }
            ConfigError::Parse { path, error } => {
                write!(f, "Failed to parse {}: {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load the configuration.
///
/// An explicit path must exist; the implicit `./krishi.toml` is optional.
/// Returns the config and the file it came from, if any.
pub fn load(explicit: Option<&Path>) -> Result<(KrishiConfig, Option<PathBuf>), ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let local = PathBuf::from(LOCAL_CONFIG_FILE);
            if !local.exists() {
                log::debug!("No {} found, using defaults", LOCAL_CONFIG_FILE);
                return Ok((KrishiConfig::default(), None));
            }
            local
        }
    };

    let config = load_file(&path)?;
    log::info!("Loaded config from {}", path.display());
    Ok((config, Some(path)))
}

/// Load a single config file.
fn load_file(path: &Path) -> Result<KrishiConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[engine]\nmax_iterations = 2\n").unwrap();

        let (config, source) = load(Some(&path)).unwrap();
        assert_eq!(source.as_deref(), Some(path.as_path()));
        assert_eq!(config.engine_config().max_iterations, 2);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[engine\nmax_iterations = ").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("Failed to parse"));
    }
}
