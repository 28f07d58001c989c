//! Feature matching and geometric verification options.

use super::{ArgList, DEFAULT_VOCAB_TREE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Strategy for choosing which image pairs to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// Every pair of images.
    #[default]
    Exhaustive,
    /// Nearest neighbors by location prior.
    Spatial,
    /// Visually similar images found through a vocabulary tree.
    VocabTree,
    /// Neighbors in sequence order, with optional loop detection.
    Sequential,
}

impl Matcher {
    /// All matchers, in display order.
    pub const ALL: [Self; 4] = [
        Self::Exhaustive,
        Self::Spatial,
        Self::VocabTree,
        Self::Sequential,
    ];

    /// Returns the matcher's name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exhaustive => "exhaustive",
            Self::Spatial => "spatial",
            Self::VocabTree => "vocab_tree",
            Self::Sequential => "sequential",
        }
    }

    /// Returns the `colmap` subcommand running this matcher.
    #[must_use]
    pub const fn subcommand(&self) -> &'static str {
        match self {
            Self::Exhaustive => "exhaustive_matcher",
            Self::Spatial => "spatial_matcher",
            Self::VocabTree => "vocab_tree_matcher",
            Self::Sequential => "sequential_matcher",
        }
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Matcher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "exhaustive" => Ok(Self::Exhaustive),
            "spatial" => Ok(Self::Spatial),
            "vocab_tree" | "vocabtree" => Ok(Self::VocabTree),
            "sequential" => Ok(Self::Sequential),
            _ => Err(format!(
                "Unknown matcher '{s}', expected one of: exhaustive, spatial, vocab-tree, sequential"
            )),
        }
    }
}

/// Descriptor matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftMatchingOptions {
    /// Run on the GPU when available.
    pub use_gpu: bool,
    /// Maximum distance ratio between the best and second-best match.
    pub max_ratio: f64,
    /// Maximum distance to the best match.
    pub max_distance: f64,
    /// Keep only mutual best matches.
    pub cross_check: bool,
    /// Maximum matches per pair.
    pub max_num_matches: i32,
    /// Rematch guided by the verified geometry.
    pub guided_matching: bool,
    /// Brute-force CPU matching instead of an index.
    pub cpu_brute_force_matcher: bool,
}

impl Default for SiftMatchingOptions {
    fn default() -> Self {
        Self {
            use_gpu: true,
            max_ratio: 0.8,
            max_distance: 0.7,
            cross_check: true,
            max_num_matches: 32768,
            guided_matching: false,
            cpu_brute_force_matcher: false,
        }
    }
}

impl SiftMatchingOptions {
    /// Returns the `--SiftMatching.*` arguments.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        ArgList::section("SiftMatching")
            .flag("use_gpu", self.use_gpu)
            .value("max_ratio", self.max_ratio)
            .value("max_distance", self.max_distance)
            .flag("cross_check", self.cross_check)
            .value("max_num_matches", self.max_num_matches)
            .flag("guided_matching", self.guided_matching)
            .flag("cpu_brute_force_matcher", self.cpu_brute_force_matcher)
            .finish()
    }
}

/// RANSAC used while verifying pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacOptions {
    /// Maximum reprojection error in pixels.
    pub max_error: f64,
    /// Minimum inlier ratio of a model.
    pub min_inlier_ratio: f64,
    /// Probability of having sampled an outlier-free set.
    pub confidence: f64,
    /// Maximum RANSAC iterations.
    pub max_num_trials: i32,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_error: 4.0,
            min_inlier_ratio: 0.01,
            confidence: 0.9999,
            max_num_trials: 100_000,
        }
    }
}

/// Geometric verification of matched pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoViewGeometryOptions {
    /// Minimum inliers for a pair to count as verified.
    pub min_num_inliers: i32,
    /// Minimum essential/fundamental matrix inlier ratio.
    pub min_e_f_inlier_ratio: f64,
    /// Maximum homography inlier ratio.
    pub max_h_inlier_ratio: f64,
    /// Minimum inlier ratio for a watermark.
    pub watermark_min_inlier_ratio: f64,
    /// Border fraction searched for watermarks.
    pub watermark_border_size: f64,
    /// Reject pairs whose matches sit on a watermark.
    pub detect_watermark: bool,
    /// Ignore watermark models when looking for several.
    pub multiple_ignore_watermark: bool,
    /// Always prefer a homography.
    pub force_h_use: bool,
    /// Store the relative pose of verified pairs.
    pub compute_relative_pose: bool,
    /// Look for several geometric models per pair.
    pub multiple_models: bool,
    /// RANSAC settings.
    pub ransac: RansacOptions,
}

impl Default for TwoViewGeometryOptions {
    fn default() -> Self {
        Self {
            min_num_inliers: 15,
            min_e_f_inlier_ratio: 0.95,
            max_h_inlier_ratio: 0.8,
            watermark_min_inlier_ratio: 0.7,
            watermark_border_size: 0.1,
            detect_watermark: true,
            multiple_ignore_watermark: true,
            force_h_use: false,
            compute_relative_pose: false,
            multiple_models: false,
            ransac: RansacOptions::default(),
        }
    }
}

impl TwoViewGeometryOptions {
    /// Returns the `--TwoViewGeometry.*` arguments.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        ArgList::section("TwoViewGeometry")
            .value("min_num_inliers", self.min_num_inliers)
            .value("min_E_F_inlier_ratio", self.min_e_f_inlier_ratio)
            .value("max_H_inlier_ratio", self.max_h_inlier_ratio)
            .value("watermark_min_inlier_ratio", self.watermark_min_inlier_ratio)
            .value("watermark_border_size", self.watermark_border_size)
            .flag("detect_watermark", self.detect_watermark)
            .flag("multiple_ignore_watermark", self.multiple_ignore_watermark)
            .flag("force_H_use", self.force_h_use)
            .flag("compute_relative_pose", self.compute_relative_pose)
            .flag("multiple_models", self.multiple_models)
            .value("max_error", self.ransac.max_error)
            .value("min_inlier_ratio", self.ransac.min_inlier_ratio)
            .value("confidence", self.ransac.confidence)
            .value("max_num_trials", self.ransac.max_num_trials)
            .finish()
    }
}

/// Exhaustive matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustiveMatchingOptions {
    /// Images loaded per block.
    pub block_size: i32,
}

impl Default for ExhaustiveMatchingOptions {
    fn default() -> Self {
        Self { block_size: 50 }
    }
}

/// Spatial matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialMatchingOptions {
    /// Ignore the Z component of the location prior.
    pub ignore_z: bool,
    /// Nearest neighbors to match.
    pub max_num_neighbors: i32,
    /// Maximum distance to a neighbor, in meters.
    pub max_distance: f64,
}

impl Default for SpatialMatchingOptions {
    fn default() -> Self {
        Self {
            ignore_z: true,
            max_num_neighbors: 50,
            max_distance: 100.0,
        }
    }
}

/// Vocabulary tree matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabTreeMatchingOptions {
    /// Images retrieved per query image.
    pub num_images: i32,
    /// Nearest neighbors retrieved per query feature.
    pub num_nearest_neighbors: i32,
    /// Nearest-neighbor checks during retrieval.
    pub num_checks: i32,
    /// Images kept after spatial verification; 0 disables it.
    pub num_images_after_verification: i32,
    /// Features indexed per image; -1 keeps all.
    pub max_num_features: i32,
    /// Vocabulary tree file, or a `url;file;sha256` download triple.
    pub vocab_tree_path: String,
    /// Optional file listing the image names to match.
    pub match_list_path: String,
}

impl Default for VocabTreeMatchingOptions {
    fn default() -> Self {
        Self {
            num_images: 100,
            num_nearest_neighbors: 5,
            num_checks: 64,
            num_images_after_verification: 0,
            max_num_features: -1,
            vocab_tree_path: DEFAULT_VOCAB_TREE.to_string(),
            match_list_path: String::new(),
        }
    }
}

/// Sequential matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialMatchingOptions {
    /// Neighbors matched in sequence order.
    pub overlap: i32,
    /// Also match quadratic neighbors.
    pub quadratic_overlap: bool,
    /// Match against all images of neighboring rig frames.
    pub expand_rig_images: bool,
    /// Periodically match against visually similar images.
    pub loop_detection: bool,
    /// Images between loop detections.
    pub loop_detection_period: i32,
    /// Images retrieved per loop detection.
    pub loop_detection_num_images: i32,
    /// Nearest neighbors per query feature during loop detection.
    pub loop_detection_num_nearest_neighbors: i32,
    /// Nearest-neighbor checks during loop detection.
    pub loop_detection_num_checks: i32,
    /// Images kept after loop detection verification; 0 disables it.
    pub loop_detection_num_images_after_verification: i32,
    /// Features indexed per image for loop detection; -1 keeps all.
    pub loop_detection_max_num_features: i32,
    /// Vocabulary tree used for loop detection.
    pub vocab_tree_path: String,
}

impl Default for SequentialMatchingOptions {
    fn default() -> Self {
        Self {
            overlap: 10,
            quadratic_overlap: true,
            expand_rig_images: true,
            loop_detection: false,
            loop_detection_period: 10,
            loop_detection_num_images: 50,
            loop_detection_num_nearest_neighbors: 1,
            loop_detection_num_checks: 64,
            loop_detection_num_images_after_verification: 0,
            loop_detection_max_num_features: -1,
            vocab_tree_path: DEFAULT_VOCAB_TREE.to_string(),
        }
    }
}

/// Everything the `colmap` matchers take besides the database path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Matcher to run.
    pub matcher: Matcher,
    /// Exhaustive matcher settings.
    pub exhaustive: ExhaustiveMatchingOptions,
    /// Spatial matcher settings.
    pub spatial: SpatialMatchingOptions,
    /// Vocabulary tree matcher settings.
    pub vocab_tree: VocabTreeMatchingOptions,
    /// Sequential matcher settings.
    pub sequential: SequentialMatchingOptions,
    /// Descriptor matching.
    pub sift: SiftMatchingOptions,
    /// Geometric verification.
    pub verification: TwoViewGeometryOptions,
}

impl MatchOptions {
    /// Returns the arguments of the selected matcher plus SIFT matching and
    /// verification.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        let mut args = self.matcher_arguments();
        args.extend(self.sift.arguments());
        args.extend(self.verification.arguments());
        args
    }

    fn matcher_arguments(&self) -> Vec<String> {
        match self.matcher {
            Matcher::Exhaustive => ArgList::section("ExhaustiveMatching")
                .value("block_size", self.exhaustive.block_size)
                .finish(),
            Matcher::Spatial => ArgList::section("SpatialMatching")
                .flag("ignore_z", self.spatial.ignore_z)
                .value("max_num_neighbors", self.spatial.max_num_neighbors)
                .value("max_distance", self.spatial.max_distance)
                .finish(),
            Matcher::VocabTree => {
                let o = &self.vocab_tree;
                let list = ArgList::section("VocabTreeMatching")
                    .value("num_images", o.num_images)
                    .value("num_nearest_neighbors", o.num_nearest_neighbors)
                    .value("num_checks", o.num_checks)
                    .value("num_images_after_verification", o.num_images_after_verification)
                    .value("max_num_features", o.max_num_features)
                    .value("vocab_tree_path", &o.vocab_tree_path);
                if o.match_list_path.is_empty() {
                    list.finish()
                } else {
                    list.value("match_list_path", &o.match_list_path).finish()
                }
            }
            Matcher::Sequential => {
                let o = &self.sequential;
                ArgList::section("SequentialMatching")
                    .value("overlap", o.overlap)
                    .flag("quadratic_overlap", o.quadratic_overlap)
                    .flag("expand_rig_images", o.expand_rig_images)
                    .flag("loop_detection", o.loop_detection)
                    .value("loop_detection_period", o.loop_detection_period)
                    .value("loop_detection_num_images", o.loop_detection_num_images)
                    .value(
                        "loop_detection_num_nearest_neighbors",
                        o.loop_detection_num_nearest_neighbors,
                    )
                    .value("loop_detection_num_checks", o.loop_detection_num_checks)
                    .value(
                        "loop_detection_num_images_after_verification",
                        o.loop_detection_num_images_after_verification,
                    )
                    .value("loop_detection_max_num_features", o.loop_detection_max_num_features)
                    .value("vocab_tree_path", &o.vocab_tree_path)
                    .finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_from_str() {
        assert_eq!("vocab-tree".parse::<Matcher>().unwrap(), Matcher::VocabTree);
        assert_eq!("Sequential".parse::<Matcher>().unwrap(), Matcher::Sequential);
        assert!("nearest".parse::<Matcher>().is_err());

        for matcher in Matcher::ALL {
            assert_eq!(matcher.as_str().parse::<Matcher>().unwrap(), matcher);
            assert!(matcher.subcommand().ends_with("_matcher"));
        }
    }

    #[test]
    fn test_only_selected_matcher_is_passed() {
        let options = MatchOptions {
            matcher: Matcher::Sequential,
            ..MatchOptions::default()
        };
        let args = options.arguments();

        assert_eq!(&args[..2], ["--SequentialMatching.overlap", "10"]);
        assert!(!args.iter().any(|a| a.starts_with("--ExhaustiveMatching")));
        assert!(args.contains(&"--SiftMatching.cross_check".to_string()));
        assert!(args.contains(&"--TwoViewGeometry.min_E_F_inlier_ratio".to_string()));
    }

    #[test]
    fn test_empty_match_list_is_omitted() {
        let mut options = MatchOptions {
            matcher: Matcher::VocabTree,
            ..MatchOptions::default()
        };
        assert!(!options.arguments().iter().any(|a| a.ends_with("match_list_path")));

        options.vocab_tree.match_list_path = "pairs.txt".to_string();
        let args = options.arguments();
        let pos = args
            .iter()
            .position(|a| a == "--VocabTreeMatching.match_list_path")
            .unwrap();
        assert_eq!(args[pos + 1], "pairs.txt");
    }
}
