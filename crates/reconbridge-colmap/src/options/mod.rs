//! Option groups passed to the tools as `--Section.key value` arguments.

mod extract;
mod glomap;
mod mapper;
mod matching;

pub use extract::{CameraMode, DescriptorNormalization, ExtractOptions, SiftExtractionOptions};
pub use glomap::{
    BundleAdjustmentOptions, GlobalPositioningOptions, GlomapOptions, RelativePoseOptions,
    ThresholdOptions, TrackEstablishmentOptions, TriangulationOptions, ViewGraphCalibrationOptions,
};
pub use mapper::MapperOptions;
pub use matching::{
    ExhaustiveMatchingOptions, MatchOptions, Matcher, RansacOptions, SequentialMatchingOptions,
    SiftMatchingOptions, SpatialMatchingOptions, TwoViewGeometryOptions, VocabTreeMatchingOptions,
};

use std::fmt::Display;

/// Vocabulary tree COLMAP downloads and caches on first use.
pub const DEFAULT_VOCAB_TREE: &str = "https://github.com/colmap/colmap/releases/download/3.11.1/vocab_tree_faiss_flickr100K_words256K.bin;vocab_tree_faiss_flickr100K_words256K.bin;96ca8ec8ea60b1f73465aaf2c401fd3b3ca75cdba2d3c50d6a2f6f760f275ddc";

/// Accumulates the arguments of one option section.
#[derive(Debug)]
pub(crate) struct ArgList<'a> {
    section: &'a str,
    args: Vec<String>,
}

impl<'a> ArgList<'a> {
    /// Starts a section; an empty section writes bare `--key` names.
    pub(crate) const fn section(section: &'a str) -> Self {
        Self {
            section,
            args: Vec::new(),
        }
    }

    pub(crate) fn value(mut self, key: &str, value: impl Display) -> Self {
        let name = if self.section.is_empty() {
            format!("--{key}")
        } else {
            format!("--{}.{key}", self.section)
        };
        self.args.push(name);
        self.args.push(value.to_string());
        self
    }

    pub(crate) fn flag(self, key: &str, value: bool) -> Self {
        self.value(key, u8::from(value))
    }

    pub(crate) fn finish(self) -> Vec<String> {
        self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_list() {
        let args = ArgList::section("SiftMatching")
            .flag("use_gpu", true)
            .value("max_ratio", 0.8)
            .finish();
        assert_eq!(args, vec!["--SiftMatching.use_gpu", "1", "--SiftMatching.max_ratio", "0.8"]);

        let args = ArgList::section("").flag("skip_pruning", true).finish();
        assert_eq!(args, vec!["--skip_pruning", "1"]);
    }
}
