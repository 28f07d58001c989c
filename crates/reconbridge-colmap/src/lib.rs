//! COLMAP and GLOMAP stages as reconbridge jobs.
//!
//! - [`ExtractFeatures`] - `colmap feature_extractor`
//! - [`MatchFeatures`] - one of the `colmap *_matcher` commands
//! - [`Solve`] - `colmap mapper`
//! - [`GlomapSolve`] - `glomap mapper`
//!
//! Option groups map onto the tools' `--Section.key value` arguments and are
//! stored per project as [`PipelineSettings`]. [`Toolchain`] finds the
//! binaries.

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod jobs;
pub mod kinds;
pub mod options;
mod settings;
mod tools;

pub use jobs::{
    ExtractFeatures, GlomapSolve, LoggedCommand, MatchFeatures, Solve, SolveArgs,
    MATCH_PROGRESS_PATTERN,
};
pub use options::{
    CameraMode, ExtractOptions, GlomapOptions, MapperOptions, MatchOptions, Matcher,
    DEFAULT_VOCAB_TREE,
};
pub use settings::PipelineSettings;
pub use tools::{Tool, ToolError, Toolchain, COLMAP_ENV, GLOMAP_ENV};
