//! Where a project keeps its files.

use crate::{ProjectError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory created next to a clip to hold its projects.
pub const PROJECTS_DIR: &str = "reconbridge";

/// Paths of one project's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Uses `root` as the project directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Derives the project directory of a clip:
    /// `<clip dir>/reconbridge/<clip file name>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the clip path has no file name.
    pub fn for_clip(clip: impl AsRef<Path>) -> Result<Self> {
        let clip = clip.as_ref();
        let name = clip
            .file_name()
            .ok_or_else(|| ProjectError::InvalidClip(clip.to_path_buf()))?;
        let dir = clip.parent().unwrap_or_else(|| Path::new(""));

        Ok(Self::new(dir.join(PROJECTS_DIR).join(name)))
    }

    /// Creates the project, frames and reconstruction directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure(&self) -> Result<()> {
        for path in [self.root(), &self.frames_dir(), &self.reconstruction_dir()] {
            if !path.exists() {
                fs::create_dir_all(path).map_err(|e| ProjectError::CreateDir {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }

    /// Returns the project directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding the image sequence.
    #[must_use]
    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    /// Returns the COLMAP database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.root.join("database.db")
    }

    /// Returns the directory holding sparse models.
    #[must_use]
    pub fn reconstruction_dir(&self) -> PathBuf {
        self.root.join("reconstruction")
    }

    /// Returns the directory of sparse model `index`.
    #[must_use]
    pub fn sparse_model(&self, index: usize) -> PathBuf {
        self.reconstruction_dir().join(index.to_string())
    }

    /// Returns the persisted settings path.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Returns the cached statistics path.
    #[must_use]
    pub fn stats_path(&self) -> PathBuf {
        self.root.join("stats.json")
    }

    /// Counts the files in the frames directory; a missing directory has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn frame_count(&self) -> Result<usize> {
        let dir = self.frames_dir();
        if !dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&dir).map_err(|e| ProjectError::Read {
            path: dir.clone(),
            source: e,
        })?;

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| ProjectError::Read {
                path: dir.clone(),
                source: e,
            })?;
            if entry.file_type().is_ok_and(|t| t.is_file()) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Returns true if the frames directory holds at least one file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn has_frames(&self) -> Result<bool> {
        Ok(self.frame_count()? > 0)
    }

    /// Lists the indices of the sparse models present, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the reconstruction directory exists but cannot be
    /// read.
    pub fn sparse_models(&self) -> Result<Vec<usize>> {
        let dir = self.reconstruction_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| ProjectError::Read {
            path: dir.clone(),
            source: e,
        })?;

        let mut models: Vec<usize> = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        models.sort_unstable();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_for_clip() {
        let layout = ProjectLayout::for_clip("/footage/shots/take3.mov").unwrap();
        assert_eq!(layout.root(), Path::new("/footage/shots/reconbridge/take3.mov"));
        assert_eq!(
            layout.database_path(),
            Path::new("/footage/shots/reconbridge/take3.mov/database.db")
        );
        assert_eq!(
            layout.sparse_model(0),
            Path::new("/footage/shots/reconbridge/take3.mov/reconstruction/0")
        );
    }

    #[test]
    fn test_for_clip_without_file_name() {
        assert!(matches!(
            ProjectLayout::for_clip("/"),
            Err(ProjectError::InvalidClip(_))
        ));
    }

    #[test]
    fn test_ensure_and_frame_count() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp_dir.path().join("project"));

        assert_eq!(layout.frame_count().unwrap(), 0);
        layout.ensure().unwrap();
        assert!(layout.frames_dir().is_dir());
        assert!(layout.reconstruction_dir().is_dir());
        assert!(!layout.has_frames().unwrap());

        for i in 1..=3 {
            fs::write(layout.frames_dir().join(format!("{i:04}.tiff")), b"").unwrap();
        }
        fs::create_dir(layout.frames_dir().join("thumbs")).unwrap();
        assert_eq!(layout.frame_count().unwrap(), 3);
        assert!(layout.has_frames().unwrap());
    }

    #[test]
    fn test_sparse_models_are_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp_dir.path());
        layout.ensure().unwrap();

        for name in ["10", "2", "0", "notes"] {
            fs::create_dir(layout.reconstruction_dir().join(name)).unwrap();
        }
        assert_eq!(layout.sparse_models().unwrap(), vec![0, 2, 10]);
    }
}
