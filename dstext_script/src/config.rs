//! Project configuration (`dstext.toml`).
//!
//! Every field is optional; command-line flags override what the file sets.
//!
//! ```toml
//! database = "Dialogue/database.ron"
//! inputs = ["Dialogue/Scripts"]
//!
//! [import]
//! extension = "dstext"
//! player_name = "Player"
//! start_sequence = "None()"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "dstext.toml";

/// Database file used when neither the config nor the command line names one.
pub const DEFAULT_DATABASE_FILE: &str = "dialogue.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Importer behaviour that is not part of the source format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportOptions {
    /// Extension of script files picked up from directories.
    pub extension: String,
    /// Name given to the player actor when the database has none.
    pub player_name: String,
    /// Sequence placed on every conversation's START entry.
    pub start_sequence: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            extension: "dstext".to_string(),
            player_name: "Player".to_string(),
            start_sequence: "None()".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub database: Option<PathBuf>,
    pub inputs: Vec<PathBuf>,
    pub import: ImportOptions,
}

impl ProjectConfig {
    /// Load an explicit config file, or `dstext.toml` if it exists.
    ///
    /// # Errors
    /// An explicitly named file must exist and parse; the default file only
    /// has to parse when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => load_config(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    load_config(path)
                } else {
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE))
    }
}

/// Parse a config file. Relative paths inside it are resolved against the
/// file's directory.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid config TOML.
pub fn load_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.database = config.database.map(|db| base.join(db));
        config.inputs = config.inputs.into_iter().map(|input| base.join(input)).collect();
    }
    info!("loaded config from '{}'", path.display());
    Ok(config)
}

/// Parse config TOML text.
///
/// # Errors
/// Returns the TOML error for malformed text or unknown keys.
pub fn parse_config(text: &str) -> Result<ProjectConfig, toml::de::Error> {
    toml::from_str(text)
}
