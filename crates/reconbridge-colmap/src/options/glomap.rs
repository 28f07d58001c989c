//! Global mapper options, passed to `glomap mapper`.

use super::ArgList;
use serde::{Deserialize, Serialize};

/// View graph calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewGraphCalibrationOptions {
    /// Lower bound on the focal length ratio.
    pub thres_lower_ratio: f64,
    /// Upper bound on the focal length ratio.
    pub thres_higher_ratio: f64,
    /// Maximum two-view error.
    pub thres_two_view_error: f64,
}

impl Default for ViewGraphCalibrationOptions {
    fn default() -> Self {
        Self {
            thres_lower_ratio: 0.1,
            thres_higher_ratio: 10.0,
            thres_two_view_error: 2.0,
        }
    }
}

/// Relative pose estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativePoseOptions {
    /// Maximum epipolar error.
    pub max_epipolar_error: f64,
}

impl Default for RelativePoseOptions {
    fn default() -> Self {
        Self {
            max_epipolar_error: 1.0,
        }
    }
}

/// Track establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackEstablishmentOptions {
    /// Minimum tracks per view; -1 disables the check.
    pub min_num_tracks_per_view: i32,
    /// Minimum views per track.
    pub min_num_view_per_track: i32,
    /// Maximum views per track.
    pub max_num_view_per_track: i32,
    /// Maximum number of tracks.
    pub max_num_tracks: i32,
}

impl Default for TrackEstablishmentOptions {
    fn default() -> Self {
        Self {
            min_num_tracks_per_view: -1,
            min_num_view_per_track: 3,
            max_num_view_per_track: 100,
            max_num_tracks: 10_000_000,
        }
    }
}

/// Global positioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalPositioningOptions {
    /// Optimize camera positions.
    pub optimize_positions: bool,
    /// Optimize point positions.
    pub optimize_points: bool,
    /// Optimize scales.
    pub optimize_scales: bool,
    /// Robust loss threshold.
    pub thres_loss_function: f64,
    /// Maximum solver iterations.
    pub max_num_iterations: i32,
}

impl Default for GlobalPositioningOptions {
    fn default() -> Self {
        Self {
            optimize_positions: true,
            optimize_points: true,
            optimize_scales: true,
            thres_loss_function: 0.1,
            max_num_iterations: 100,
        }
    }
}

/// Bundle adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleAdjustmentOptions {
    /// Optimize camera rotations.
    pub optimize_rotations: bool,
    /// Optimize camera translations.
    pub optimize_translation: bool,
    /// Optimize intrinsics.
    pub optimize_intrinsics: bool,
    /// Optimize principal points.
    pub optimize_principal_point: bool,
    /// Optimize point positions.
    pub optimize_points: bool,
    /// Robust loss threshold.
    pub thres_loss_function: f64,
    /// Maximum solver iterations.
    pub max_num_iterations: i32,
}

impl Default for BundleAdjustmentOptions {
    fn default() -> Self {
        Self {
            optimize_rotations: true,
            optimize_translation: true,
            optimize_intrinsics: true,
            optimize_principal_point: false,
            optimize_points: true,
            thres_loss_function: 1.0,
            max_num_iterations: 200,
        }
    }
}

/// Triangulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationOptions {
    /// Maximum reprojection error when completing tracks.
    pub complete_max_reproj_error: f64,
    /// Maximum reprojection error when merging tracks.
    pub merge_max_reproj_error: f64,
    /// Minimum triangulation angle, in degrees.
    pub min_angle: f64,
    /// Minimum matches for a pair to be triangulated.
    pub min_num_matches: i32,
}

impl Default for TriangulationOptions {
    fn default() -> Self {
        Self {
            complete_max_reproj_error: 15.0,
            merge_max_reproj_error: 15.0,
            min_angle: 1.0,
            min_num_matches: 15,
        }
    }
}

/// Inlier thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOptions {
    /// Maximum angular error.
    pub max_angle_error: f64,
    /// Maximum reprojection error.
    pub max_reprojection_error: f64,
    /// Minimum triangulation angle.
    pub min_triangulation_angle: f64,
    /// Maximum epipolar error for essential matrices.
    pub max_epipolar_error_e: f64,
    /// Maximum epipolar error for fundamental matrices.
    pub max_epipolar_error_f: f64,
    /// Maximum epipolar error for homographies.
    pub max_epipolar_error_h: f64,
    /// Minimum inliers.
    pub min_inlier_num: i32,
    /// Minimum inlier ratio.
    pub min_inlier_ratio: f64,
    /// Maximum rotation error.
    pub max_rotation_error: f64,
}

impl Default for ThresholdOptions {
    fn default() -> Self {
        Self {
            max_angle_error: 1.0,
            max_reprojection_error: 0.01,
            min_triangulation_angle: 1.0,
            max_epipolar_error_e: 1.0,
            max_epipolar_error_f: 4.0,
            max_epipolar_error_h: 4.0,
            min_inlier_num: 30,
            min_inlier_ratio: 0.25,
            max_rotation_error: 10.0,
        }
    }
}

/// Everything `glomap mapper` takes besides paths.
///
/// The `use_*` switches are passed to the tool as inverted `--skip_*` flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlomapOptions {
    /// Run positioning and bundle adjustment on the GPU.
    pub use_gpu: bool,
    /// Bundle adjustment rounds.
    pub ba_iteration_num: i32,
    /// Retriangulation rounds.
    pub retriangulation_iteration_num: i32,
    /// Run preprocessing.
    pub use_preprocessing: bool,
    /// Run view graph calibration.
    pub use_view_graph_calibration: bool,
    /// Run relative pose estimation.
    pub use_relative_pose_estimation: bool,
    /// Run rotation averaging.
    pub use_rotation_averaging: bool,
    /// Run global positioning.
    pub use_global_positioning: bool,
    /// Run bundle adjustment.
    pub use_bundle_adjustment: bool,
    /// Run retriangulation.
    pub use_retriangulation: bool,
    /// Prune the reconstruction.
    pub use_pruning: bool,
    /// View graph calibration settings.
    pub view_graph_calibration: ViewGraphCalibrationOptions,
    /// Relative pose settings.
    pub relative_pose: RelativePoseOptions,
    /// Track establishment settings.
    pub track_establishment: TrackEstablishmentOptions,
    /// Global positioning settings.
    pub global_positioning: GlobalPositioningOptions,
    /// Bundle adjustment settings.
    pub bundle_adjustment: BundleAdjustmentOptions,
    /// Triangulation settings.
    pub triangulation: TriangulationOptions,
    /// Inlier thresholds.
    pub thresholds: ThresholdOptions,
}

impl Default for GlomapOptions {
    fn default() -> Self {
        Self {
            use_gpu: true,
            ba_iteration_num: 3,
            retriangulation_iteration_num: 1,
            use_preprocessing: true,
            use_view_graph_calibration: true,
            use_relative_pose_estimation: true,
            use_rotation_averaging: true,
            use_global_positioning: true,
            use_bundle_adjustment: true,
            use_retriangulation: true,
            use_pruning: false,
            view_graph_calibration: ViewGraphCalibrationOptions::default(),
            relative_pose: RelativePoseOptions::default(),
            track_establishment: TrackEstablishmentOptions::default(),
            global_positioning: GlobalPositioningOptions::default(),
            bundle_adjustment: BundleAdjustmentOptions::default(),
            triangulation: TriangulationOptions::default(),
            thresholds: ThresholdOptions::default(),
        }
    }
}

impl GlomapOptions {
    /// Returns every option as `glomap mapper` arguments.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        let mut args = ArgList::section("")
            .value("ba_iteration_num", self.ba_iteration_num)
            .value("retriangulation_iteration_num", self.retriangulation_iteration_num)
            .flag("skip_preprocessing", !self.use_preprocessing)
            .flag("skip_view_graph_calibration", !self.use_view_graph_calibration)
            .flag("skip_relative_pose_estimation", !self.use_relative_pose_estimation)
            .flag("skip_rotation_averaging", !self.use_rotation_averaging)
            .flag("skip_global_positioning", !self.use_global_positioning)
            .flag("skip_bundle_adjustment", !self.use_bundle_adjustment)
            .flag("skip_retriangulation", !self.use_retriangulation)
            .flag("skip_pruning", !self.use_pruning)
            .finish();

        let vgc = &self.view_graph_calibration;
        args.extend(
            ArgList::section("ViewGraphCalib")
                .value("thres_lower_ratio", vgc.thres_lower_ratio)
                .value("thres_higher_ratio", vgc.thres_higher_ratio)
                .value("thres_two_view_error", vgc.thres_two_view_error)
                .finish(),
        );

        args.extend(
            ArgList::section("RelPoseEstimation")
                .value("max_epipolar_error", self.relative_pose.max_epipolar_error)
                .finish(),
        );

        let te = &self.track_establishment;
        args.extend(
            ArgList::section("TrackEstablishment")
                .value("min_num_tracks_per_view", te.min_num_tracks_per_view)
                .value("min_num_view_per_track", te.min_num_view_per_track)
                .value("max_num_view_per_track", te.max_num_view_per_track)
                .value("max_num_tracks", te.max_num_tracks)
                .finish(),
        );

        let gp = &self.global_positioning;
        args.extend(
            ArgList::section("GlobalPositioning")
                .flag("use_gpu", self.use_gpu)
                .flag("optimize_positions", gp.optimize_positions)
                .flag("optimize_points", gp.optimize_points)
                .flag("optimize_scales", gp.optimize_scales)
                .value("thres_loss_function", gp.thres_loss_function)
                .value("max_num_iterations", gp.max_num_iterations)
                .finish(),
        );

        let ba = &self.bundle_adjustment;
        args.extend(
            ArgList::section("BundleAdjustment")
                .flag("use_gpu", self.use_gpu)
                .flag("optimize_rotations", ba.optimize_rotations)
                .flag("optimize_translation", ba.optimize_translation)
                .flag("optimize_intrinsics", ba.optimize_intrinsics)
                .flag("optimize_principal_point", ba.optimize_principal_point)
                .flag("optimize_points", ba.optimize_points)
                .value("thres_loss_function", ba.thres_loss_function)
                .value("max_num_iterations", ba.max_num_iterations)
                .finish(),
        );

        let tri = &self.triangulation;
        args.extend(
            ArgList::section("Triangulation")
                .value("complete_max_reproj_error", tri.complete_max_reproj_error)
                .value("merge_max_reproj_error", tri.merge_max_reproj_error)
                .value("min_angle", tri.min_angle)
                .value("min_num_matches", tri.min_num_matches)
                .finish(),
        );

        let th = &self.thresholds;
        args.extend(
            ArgList::section("Thresholds")
                .value("max_angle_error", th.max_angle_error)
                .value("max_reprojection_error", th.max_reprojection_error)
                .value("min_triangulation_angle", th.min_triangulation_angle)
                .value("max_epipolar_error_E", th.max_epipolar_error_e)
                .value("max_epipolar_error_F", th.max_epipolar_error_f)
                .value("max_epipolar_error_H", th.max_epipolar_error_h)
                .value("min_inlier_num", th.min_inlier_num)
                .value("min_inlier_ratio", th.min_inlier_ratio)
                .value("max_rotation_error", th.max_rotation_error)
                .finish(),
        );

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of<'a>(args: &'a [String], key: &str) -> &'a str {
        let pos = args.iter().position(|a| a == key).unwrap();
        &args[pos + 1]
    }

    #[test]
    fn test_skip_flags_are_inverted() {
        let args = GlomapOptions::default().arguments();

        assert_eq!(value_of(&args, "--skip_preprocessing"), "0");
        assert_eq!(value_of(&args, "--skip_pruning"), "1");
        assert_eq!(value_of(&args, "--GlobalPositioning.use_gpu"), "1");
        assert_eq!(value_of(&args, "--BundleAdjustment.use_gpu"), "1");
    }

    #[test]
    fn test_sections_are_present() {
        let options = GlomapOptions {
            use_gpu: false,
            ..GlomapOptions::default()
        };
        let args = options.arguments();

        assert_eq!(value_of(&args, "--ViewGraphCalib.thres_lower_ratio"), "0.1");
        assert_eq!(value_of(&args, "--TrackEstablishment.max_num_tracks"), "10000000");
        assert_eq!(value_of(&args, "--Thresholds.max_epipolar_error_F"), "4");
        assert_eq!(value_of(&args, "--BundleAdjustment.use_gpu"), "0");
        assert_eq!(args.len() % 2, 0);
    }
}
