use std::path::{Component, Path};

use crate::FetchError;

/// Validates that a remote-chosen destination name stays inside the
/// destination directory.
///
/// Rejects:
/// - Empty names
/// - Absolute paths
/// - Parent directory traversal (`..`)
/// - Windows prefix components (`C:`, `\\server`)
pub fn validate_destination_name(name: &str) -> Result<(), FetchError> {
    if name.is_empty() {
        return Err(FetchError::InvalidName("empty name".into()));
    }

    let path = Path::new(name);

    if path.is_absolute() {
        return Err(FetchError::InvalidName(format!(
            "absolute path not allowed: {name}"
        )));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(FetchError::InvalidName(format!(
                    "parent directory traversal not allowed: {name}"
                )));
            }
            Component::Prefix(_) => {
                return Err(FetchError::InvalidName(format!(
                    "path prefix not allowed: {name}"
                )));
            }
            Component::RootDir => {
                return Err(FetchError::InvalidName(format!(
                    "absolute path not allowed: {name}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}
