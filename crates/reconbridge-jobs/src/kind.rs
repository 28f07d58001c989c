//! Job kind identifiers.

use std::borrow::Cow;

/// Identifier for a class of work, used as the exclusion key.
///
/// Two jobs with equal kinds can never run at the same time; jobs of
/// different kinds may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKind(Cow<'static, str>);

impl JobKind {
    /// Creates a kind from a static name, usable in `const` items.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a kind from an owned name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for JobKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for JobKind {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLVE: JobKind = JobKind::from_static("solve");

    #[test]
    fn test_static_and_owned_kinds_are_equal() {
        assert_eq!(SOLVE, JobKind::new("solve".to_string()));
        assert_ne!(SOLVE, JobKind::from("match-features"));
    }

    #[test]
    fn test_display() {
        assert_eq!(SOLVE.to_string(), "solve");
        assert_eq!(SOLVE.as_str(), "solve");
    }
}
