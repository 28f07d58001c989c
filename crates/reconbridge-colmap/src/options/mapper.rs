//! Incremental mapper options.

use super::ArgList;
use serde::{Deserialize, Serialize};

/// Options of `colmap mapper`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// Minimum verified matches for a pair to be used.
    pub min_num_matches: i32,
    /// Keep reconstructing new models once registration stalls.
    pub multiple_models: bool,
    /// Maximum number of models.
    pub max_num_models: i32,
    /// Minimum registered images for a model to be kept.
    pub min_model_size: i32,
    /// Minimum inliers of the initial image pair.
    pub init_min_num_inliers: i32,
    /// Minimum inliers when registering an image.
    pub abs_pose_min_num_inliers: i32,
    /// Maximum reprojection error when filtering observations, in pixels.
    pub filter_max_reproj_error: f64,
    /// Refine focal lengths in bundle adjustment.
    pub ba_refine_focal_length: bool,
    /// Refine principal points in bundle adjustment.
    pub ba_refine_principal_point: bool,
    /// Refine distortion parameters in bundle adjustment.
    pub ba_refine_extra_params: bool,
    /// Threads to use; -1 uses all cores.
    pub num_threads: i32,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            min_num_matches: 15,
            multiple_models: true,
            max_num_models: 50,
            min_model_size: 10,
            init_min_num_inliers: 100,
            abs_pose_min_num_inliers: 30,
            filter_max_reproj_error: 4.0,
            ba_refine_focal_length: true,
            ba_refine_principal_point: false,
            ba_refine_extra_params: true,
            num_threads: -1,
        }
    }
}

impl MapperOptions {
    /// Returns the `--Mapper.*` arguments.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        ArgList::section("Mapper")
            .value("min_num_matches", self.min_num_matches)
            .flag("multiple_models", self.multiple_models)
            .value("max_num_models", self.max_num_models)
            .value("min_model_size", self.min_model_size)
            .value("init_min_num_inliers", self.init_min_num_inliers)
            .value("abs_pose_min_num_inliers", self.abs_pose_min_num_inliers)
            .value("filter_max_reproj_error", self.filter_max_reproj_error)
            .flag("ba_refine_focal_length", self.ba_refine_focal_length)
            .flag("ba_refine_principal_point", self.ba_refine_principal_point)
            .flag("ba_refine_extra_params", self.ba_refine_extra_params)
            .value("num_threads", self.num_threads)
            .finish()
    }
}
