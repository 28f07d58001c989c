//! Read and clear access to a COLMAP database.

use crate::{ProjectError, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// Tables written by feature extraction.
pub const FEATURE_TABLES: &[&str] = &[
    "cameras",
    "images",
    "keypoints",
    "descriptors",
    "rigs",
    "rig_sensors",
    "frames",
    "frame_data",
    "pose_priors",
];

/// Tables written by feature matching.
pub const MATCH_TABLES: &[&str] = &["matches", "two_view_geometries"];

/// Raw counts read from a database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseCounts {
    /// Registered images.
    pub images: u64,
    /// Feature descriptors over all images.
    pub descriptors: u64,
    /// Raw feature matches over all pairs.
    pub matches: u64,
    /// Geometrically verified matches over all pairs.
    pub inlier_matches: u64,
    /// Image pairs with at least one raw match.
    pub matched_image_pairs: u64,
    /// Image pairs with at least one verified match.
    pub verified_image_pairs: u64,
}

/// A COLMAP database file, opened on demand.
///
/// A file that does not exist is treated as an empty database and is never
/// created by this type.
#[derive(Debug, Clone)]
pub struct ColmapDatabase {
    path: PathBuf,
}

impl ColmapDatabase {
    /// Creates a handle for the database at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the database file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the statistics; absent tables count as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the database exists but cannot be queried.
    pub fn counts(&self) -> Result<DatabaseCounts> {
        let Some(conn) = self.open(OpenFlags::SQLITE_OPEN_READ_ONLY)? else {
            return Ok(DatabaseCounts::default());
        };

        Ok(DatabaseCounts {
            images: self.scalar(&conn, "images", "SELECT COUNT(*) FROM images")?,
            descriptors: self.scalar(&conn, "descriptors", "SELECT SUM(rows) FROM descriptors")?,
            matches: self.scalar(&conn, "matches", "SELECT SUM(rows) FROM matches")?,
            inlier_matches: self.scalar(
                &conn,
                "two_view_geometries",
                "SELECT SUM(rows) FROM two_view_geometries",
            )?,
            matched_image_pairs: self.scalar(
                &conn,
                "matches",
                "SELECT COUNT(*) FROM matches WHERE rows > 0",
            )?,
            verified_image_pairs: self.scalar(
                &conn,
                "two_view_geometries",
                "SELECT COUNT(*) FROM two_view_geometries WHERE rows > 0",
            )?,
        })
    }

    /// Deletes every row of the listed tables that exist, in one transaction.
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database exists but cannot be changed.
    pub fn clear_tables(&self, tables: &[&str]) -> Result<u64> {
        let Some(mut conn) = self.open(OpenFlags::SQLITE_OPEN_READ_WRITE)? else {
            return Ok(0);
        };

        let tx = conn.transaction().map_err(|e| self.error(e))?;
        let mut deleted = 0;
        for table in tables {
            if Self::table_exists(&tx, table).map_err(|e| self.error(e))? {
                deleted += tx
                    .execute(&format!("DELETE FROM \"{table}\""), [])
                    .map_err(|e| self.error(e))? as u64;
            }
        }
        tx.commit().map_err(|e| self.error(e))?;

        tracing::debug!(path = %self.path.display(), ?tables, deleted, "Cleared database tables");
        Ok(deleted)
    }

    /// Deletes every row of every known table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database exists but cannot be changed.
    pub fn clear_all_tables(&self) -> Result<u64> {
        let tables: Vec<&str> = FEATURE_TABLES.iter().chain(MATCH_TABLES).copied().collect();
        self.clear_tables(&tables)
    }

    fn open(&self, flags: OpenFlags) -> Result<Option<Connection>> {
        if !self.exists() {
            return Ok(None);
        }
        Connection::open_with_flags(&self.path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map(Some)
            .map_err(|e| self.error(e))
    }

    fn scalar(&self, conn: &Connection, table: &str, sql: &str) -> Result<u64> {
        if !Self::table_exists(conn, table).map_err(|e| self.error(e))? {
            return Ok(0);
        }
        let value: Option<i64> = conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| self.error(e))?;
        Ok(value.map_or(0, |v| v.max(0) as u64))
    }

    fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
    }

    fn error(&self, source: rusqlite::Error) -> ProjectError {
        ProjectError::Database {
            path: self.path.clone(),
            source,
        }
    }
}

/// Creates the subset of the COLMAP schema the statistics read.
#[cfg(test)]
pub(crate) fn create_test_schema(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE cameras (camera_id INTEGER PRIMARY KEY, model INTEGER NOT NULL);
        CREATE TABLE images (image_id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, camera_id INTEGER NOT NULL);
        CREATE TABLE keypoints (image_id INTEGER PRIMARY KEY, rows INTEGER NOT NULL, cols INTEGER NOT NULL, data BLOB);
        CREATE TABLE descriptors (image_id INTEGER PRIMARY KEY, rows INTEGER NOT NULL, cols INTEGER NOT NULL, data BLOB);
        CREATE TABLE matches (pair_id INTEGER PRIMARY KEY, rows INTEGER NOT NULL, cols INTEGER NOT NULL, data BLOB);
        CREATE TABLE two_view_geometries (pair_id INTEGER PRIMARY KEY, rows INTEGER NOT NULL, cols INTEGER NOT NULL, data BLOB, config INTEGER NOT NULL);
        "#,
    )
    .unwrap();
    conn
}

/// Fills the schema with three images, two matched pairs and one verified pair.
#[cfg(test)]
pub(crate) fn populate_test_database(conn: &Connection) {
    conn.execute_batch(
        r#"
        INSERT INTO cameras VALUES (1, 2);
        INSERT INTO images VALUES (1, '0001.tiff', 1), (2, '0002.tiff', 1), (3, '0003.tiff', 1);
        INSERT INTO keypoints VALUES (1, 500, 6, NULL), (2, 400, 6, NULL), (3, 300, 6, NULL);
        INSERT INTO descriptors VALUES (1, 500, 128, NULL), (2, 400, 128, NULL), (3, 300, 128, NULL);
        INSERT INTO matches VALUES (2147483649, 120, 2, NULL), (2147483650, 80, 2, NULL), (4294967299, 0, 2, NULL);
        INSERT INTO two_view_geometries VALUES (2147483649, 100, 2, NULL, 2), (2147483650, 0, 2, NULL, 1);
        "#,
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_database_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let database = ColmapDatabase::new(temp_dir.path().join("database.db"));

        assert_eq!(database.counts().unwrap(), DatabaseCounts::default());
        assert_eq!(database.clear_all_tables().unwrap(), 0);
        assert!(!database.exists());
    }

    #[test]
    fn test_counts() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.db");
        let conn = create_test_schema(&path);
        populate_test_database(&conn);
        drop(conn);

        let counts = ColmapDatabase::new(&path).counts().unwrap();
        assert_eq!(
            counts,
            DatabaseCounts {
                images: 3,
                descriptors: 1200,
                matches: 200,
                inlier_matches: 100,
                matched_image_pairs: 2,
                verified_image_pairs: 1,
            }
        );
    }

    #[test]
    fn test_missing_tables_count_as_zero() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE images (image_id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();
        conn.execute("INSERT INTO images VALUES (1, 'a.tiff')", []).unwrap();
        drop(conn);

        let counts = ColmapDatabase::new(&path).counts().unwrap();
        assert_eq!(counts.images, 1);
        assert_eq!(counts.descriptors, 0);
        assert_eq!(counts.verified_image_pairs, 0);
    }

    #[test]
    fn test_clear_match_tables_keeps_features() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.db");
        let conn = create_test_schema(&path);
        populate_test_database(&conn);
        drop(conn);

        let database = ColmapDatabase::new(&path);
        assert_eq!(database.clear_tables(MATCH_TABLES).unwrap(), 5);

        let counts = database.counts().unwrap();
        assert_eq!(counts.matches, 0);
        assert_eq!(counts.matched_image_pairs, 0);
        assert_eq!(counts.descriptors, 1200);

        database.clear_all_tables().unwrap();
        assert_eq!(database.counts().unwrap(), DatabaseCounts::default());
    }
}
