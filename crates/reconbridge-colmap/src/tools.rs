//! Locating the external tool binaries.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the `colmap` binary.
pub const COLMAP_ENV: &str = "RECONBRIDGE_COLMAP";

/// Environment variable naming the `glomap` binary.
pub const GLOMAP_ENV: &str = "RECONBRIDGE_GLOMAP";

/// An external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// COLMAP.
    Colmap,
    /// GLOMAP.
    Glomap,
}

impl Tool {
    /// Returns the binary name searched on `PATH`.
    #[must_use]
    pub const fn binary_name(&self) -> &'static str {
        match self {
            Self::Colmap => "colmap",
            Self::Glomap => "glomap",
        }
    }

    /// Returns the environment variable overriding the binary.
    #[must_use]
    pub const fn env_var(&self) -> &'static str {
        match self {
            Self::Colmap => COLMAP_ENV,
            Self::Glomap => GLOMAP_ENV,
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.binary_name())
    }
}

/// Errors from locating a tool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A configured path does not exist.
    #[error("{tool} binary '{path}' does not exist")]
    Missing {
        /// The tool.
        tool: Tool,
        /// The configured path.
        path: PathBuf,
    },

    /// The tool was not configured and is not on `PATH`.
    #[error("{tool} not found on PATH; install it or set {env}", env = .tool.env_var())]
    NotFound {
        /// The tool.
        tool: Tool,
    },
}

/// Configured tool paths.
///
/// A tool is looked up through its explicit path, then its environment
/// variable, then `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    colmap: Option<PathBuf>,
    glomap: Option<PathBuf>,
}

impl Toolchain {
    /// Creates a toolchain with optional explicit paths.
    #[must_use]
    pub const fn new(colmap: Option<PathBuf>, glomap: Option<PathBuf>) -> Self {
        Self { colmap, glomap }
    }

    /// Returns the explicit path of `tool`, if any.
    #[must_use]
    pub fn explicit(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Colmap => self.colmap.as_deref(),
            Tool::Glomap => self.glomap.as_deref(),
        }
    }

    /// Locates `tool`.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured path does not exist or the tool
    /// cannot be found.
    pub fn resolve(&self, tool: Tool) -> Result<PathBuf, ToolError> {
        self.resolve_with(tool, std::env::var_os(tool.env_var()), |name| {
            which::which(name).ok()
        })
    }

    fn resolve_with<F>(
        &self,
        tool: Tool,
        env: Option<OsString>,
        search: F,
    ) -> Result<PathBuf, ToolError>
    where
        F: FnOnce(&str) -> Option<PathBuf>,
    {
        let configured = self
            .explicit(tool)
            .map(Path::to_path_buf)
            .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from));

        if let Some(path) = configured {
            if path.exists() {
                return Ok(path);
            }
            return Err(ToolError::Missing { tool, path });
        }

        let found = search(tool.binary_name()).ok_or(ToolError::NotFound { tool })?;
        tracing::debug!(%tool, path = %found.display(), "Found tool on PATH");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_explicit_path_wins() {
        let binary = NamedTempFile::new().unwrap();
        let toolchain = Toolchain::new(Some(binary.path().to_path_buf()), None);

        let path = toolchain
            .resolve_with(Tool::Colmap, Some("/elsewhere/colmap".into()), |_| None)
            .unwrap();
        assert_eq!(path, binary.path());
    }

    #[test]
    fn test_env_var_before_path_search() {
        let binary = NamedTempFile::new().unwrap();
        let toolchain = Toolchain::default();

        let path = toolchain
            .resolve_with(Tool::Glomap, Some(binary.path().into()), |_| {
                Some(PathBuf::from("/usr/bin/glomap"))
            })
            .unwrap();
        assert_eq!(path, binary.path());
    }

    #[test]
    fn test_path_search() {
        let toolchain = Toolchain::default();

        let path = toolchain
            .resolve_with(Tool::Colmap, Some(OsString::new()), |name| {
                Some(PathBuf::from("/opt/bin").join(name))
            })
            .unwrap();
        assert_eq!(path, PathBuf::from("/opt/bin/colmap"));
    }

    #[test]
    fn test_errors() {
        let toolchain = Toolchain::new(None, Some(PathBuf::from("/does/not/exist/glomap")));

        let err = toolchain.resolve_with(Tool::Glomap, None, |_| None).unwrap_err();
        assert!(matches!(err, ToolError::Missing { tool: Tool::Glomap, .. }));

        let err = toolchain.resolve_with(Tool::Colmap, None, |_| None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "colmap not found on PATH; install it or set RECONBRIDGE_COLMAP"
        );
    }
}
