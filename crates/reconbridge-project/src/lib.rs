//! Project state for reconbridge.
//!
//! - [`ProjectLayout`] - Paths of a project's files next to its clip
//! - [`Project`] - Statistics refresh and per-stage clear operations
//! - [`ColmapDatabase`] - Read and clear access to the COLMAP database
//! - [`CachedStats`] - Statistics cached in `stats.json`
//! - [`JsonStore`] - JSON-backed persisted values

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod database;
mod error;
mod layout;
mod project;
mod stats;
mod store;

pub use database::{ColmapDatabase, DatabaseCounts, FEATURE_TABLES, MATCH_TABLES};
pub use error::{ProjectError, Result};
pub use layout::{PROJECTS_DIR, ProjectLayout};
pub use project::Project;
pub use stats::CachedStats;
pub use store::JsonStore;
