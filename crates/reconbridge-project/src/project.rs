//! A project: its layout, database and cached statistics.

use crate::database::{ColmapDatabase, FEATURE_TABLES, MATCH_TABLES};
use crate::{CachedStats, JsonStore, ProjectError, ProjectLayout, Result};
use std::fs;
use std::path::Path;

/// One reconstruction project on disk.
#[derive(Debug, Clone)]
pub struct Project {
    layout: ProjectLayout,
    database: ColmapDatabase,
    stats: JsonStore<CachedStats>,
}

impl Project {
    /// Opens the project at `layout`, creating its directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open(layout: ProjectLayout) -> Result<Self> {
        layout.ensure()?;
        Ok(Self {
            database: ColmapDatabase::new(layout.database_path()),
            stats: JsonStore::new(layout.stats_path()),
            layout,
        })
    }

    /// Returns the project layout.
    #[must_use]
    pub const fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Returns the project database.
    #[must_use]
    pub const fn database(&self) -> &ColmapDatabase {
        &self.database
    }

    /// Returns the statistics cached by the last refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file exists but cannot be read.
    pub fn cached_stats(&self) -> Result<CachedStats> {
        self.stats.load()
    }

    /// Reads the statistics from the database and caches them.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried or the cache
    /// cannot be written.
    pub fn refresh_stats(&self) -> Result<CachedStats> {
        let stats = CachedStats::from_counts(self.database.counts()?);
        self.stats.save(&stats)?;
        tracing::debug!(
            project = %self.layout.root().display(),
            images = stats.images,
            verified_pairs = stats.verified_image_pairs,
            "Refreshed statistics"
        );
        Ok(stats)
    }

    /// Removes extracted images, cameras and features from the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be changed.
    pub fn clear_feature_extraction(&self) -> Result<CachedStats> {
        self.database.clear_tables(FEATURE_TABLES)?;
        self.refresh_stats()
    }

    /// Removes raw and verified matches from the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be changed.
    pub fn clear_feature_matches(&self) -> Result<CachedStats> {
        self.database.clear_tables(MATCH_TABLES)?;
        self.refresh_stats()
    }

    /// Removes every sparse model.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed or recreated.
    pub fn clear_reconstruction(&self) -> Result<()> {
        recreate_dir(&self.layout.reconstruction_dir())
    }

    /// Removes the image sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed or recreated.
    pub fn clear_images(&self) -> Result<()> {
        recreate_dir(&self.layout.frames_dir())
    }

    /// Empties the database and removes sparse models and images.
    ///
    /// # Errors
    ///
    /// Returns an error if any part cannot be cleared.
    pub fn clear_all(&self) -> Result<CachedStats> {
        self.database.clear_all_tables()?;
        let stats = self.refresh_stats()?;
        self.clear_reconstruction()?;
        self.clear_images()?;
        Ok(stats)
    }
}

fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| ProjectError::Remove {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    fs::create_dir_all(path).map_err(|e| ProjectError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}
