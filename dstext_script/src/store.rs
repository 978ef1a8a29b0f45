//! Loading and saving the dialogue database as RON.

use std::fs;
use std::path::{Path, PathBuf};

use dstext_data::DialogueDatabase;
use log::info;
use ron::ser::PrettyConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading database '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing database '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("serializing database: {0}")]
    Serialize(#[from] ron::Error),
    #[error("writing database '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load a database from a RON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_database(path: &Path) -> Result<DialogueDatabase, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let db: DialogueDatabase = ron::from_str(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "loaded database '{}' ({} conversations, {} actors)",
        path.display(),
        db.conversations.len(),
        db.actors.len()
    );
    Ok(db)
}

/// Load a database, or start an empty one when the file does not exist yet.
///
/// # Errors
/// Returns an error if an existing file cannot be read or parsed.
pub fn load_or_new(path: &Path) -> Result<DialogueDatabase, StoreError> {
    if path.exists() {
        load_database(path)
    } else {
        info!("no database at '{}', starting a new one", path.display());
        Ok(DialogueDatabase::new())
    }
}

/// Write a database as pretty-printed RON, creating parent directories.
///
/// # Errors
/// Returns an error if serialization or any filesystem write fails.
pub fn save_database(path: &Path, db: &DialogueDatabase) -> Result<(), StoreError> {
    let text = ron::ser::to_string_pretty(db, PrettyConfig::default())?;
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)?;
    info!("saved database to '{}'", path.display());
    Ok(())
}
