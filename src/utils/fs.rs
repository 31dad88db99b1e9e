//! Filesystem utilities.
//!
//! Helper functions for file operations.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{OfferError, Result};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Read a file to string, returning None if it doesn't exist.
pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(std::fs::read_to_string(path)?))
    } else {
        Ok(None)
    }
}

/// Read and parse a JSON file. Missing or blank files yield `None`.
pub fn read_json_optional<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Option<T>> {
    let path = path.as_ref();
    let Some(raw) = read_optional(path)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&raw)
        .map_err(|err| OfferError::Serialization(format!("parse {}: {err}", path.display())))?;
    Ok(Some(value))
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
///
/// The payload is written to a temp file in the same directory and renamed
/// over the target, so readers never see a half-written file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| OfferError::Serialization(format!("serialize {}: {err}", path.display())))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|err| OfferError::Io(err.error))?;
    Ok(())
}

/// Remove a file if it exists.
pub fn remove_if_exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(OfferError::Io(err)),
    }
}
