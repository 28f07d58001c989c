//! JSON files holding project state.

use crate::{ProjectError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A value persisted as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonStore<T> {
    path: PathBuf,
    _value: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _value: PhantomData,
        }
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the value, or its default if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<T> {
        if !self.path.exists() {
            return Ok(T::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| ProjectError::Read {
            path: self.path.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ProjectError::ParseJson {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Writes the value, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or written.
    pub fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.exists()) {
            fs::create_dir_all(parent).map_err(|e| ProjectError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, json).map_err(|e| ProjectError::WriteFile {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Replaces the file with the default value and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the default cannot be written.
    pub fn reset(&self) -> Result<T> {
        let value = T::default();
        self.save(&value)?;
        Ok(value)
    }
}
