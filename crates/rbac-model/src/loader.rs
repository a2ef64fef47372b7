//! Loading the desired-state file from disk

use std::fs;
use std::path::Path;

use crate::schema::DesiredState;
use crate::{Error, Result};

/// Largest desired-state file accepted, in bytes.
pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Load and parse a desired-state YAML file.
///
/// Parsing does not validate; call [`crate::validate`] on the result.
///
/// # Errors
///
/// - [`Error::ConfigNotFound`] when `path` does not exist
/// - [`Error::ConfigTooLarge`] when the file exceeds [`MAX_CONFIG_SIZE`]
/// - [`Error::InvalidConfig`] when the content is not valid YAML for the schema
pub fn load_from_file(path: &Path) -> Result<DesiredState> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let size = fs::metadata(path)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size > MAX_CONFIG_SIZE {
        return Err(Error::ConfigTooLarge {
            path: path.to_path_buf(),
            size,
            max: MAX_CONFIG_SIZE,
        });
    }

    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = size, "Loaded desired state");
    parse_at(&content, path)
}

/// Parse desired-state YAML held in memory.
pub fn parse(content: &str) -> Result<DesiredState> {
    parse_at(content, Path::new("<inline>"))
}

fn parse_at(content: &str, path: &Path) -> Result<DesiredState> {
    serde_yaml::from_str(content).map_err(|e| Error::InvalidConfig {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
