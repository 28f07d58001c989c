//! Feature extraction options.

use super::ArgList;
use serde::{Deserialize, Serialize};

/// How cameras are shared between images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Let COLMAP decide from image metadata.
    #[default]
    Auto,
    /// One camera for all images.
    Single,
    /// One camera per folder.
    PerFolder,
    /// One camera per image.
    PerImage,
}

impl CameraMode {
    fn arguments(self) -> Vec<String> {
        let list = ArgList::section("ImageReader");
        match self {
            Self::Auto => list,
            Self::Single => list.flag("single_camera", true),
            Self::PerFolder => list.flag("single_camera_per_folder", true),
            Self::PerImage => list.flag("single_camera_per_image", true),
        }
        .finish()
    }
}

/// Descriptor normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DescriptorNormalization {
    /// L1-normalize, then take the element-wise square root.
    #[default]
    L1Root,
    /// L2-normalize.
    L2,
}

impl DescriptorNormalization {
    const fn as_str(self) -> &'static str {
        match self {
            Self::L1Root => "L1_ROOT",
            Self::L2 => "L2",
        }
    }
}

/// SIFT feature detection and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftExtractionOptions {
    /// Run on the GPU when available.
    pub use_gpu: bool,
    /// Maximum features per image, keeping the larger-scale ones.
    pub max_num_features: i32,
    /// First pyramid octave; -1 upsamples the image by one level.
    pub first_octave: i32,
    /// Number of pyramid octaves.
    pub num_octaves: i32,
    /// Levels per octave.
    pub octave_resolution: i32,
    /// Peak threshold for detection.
    pub peak_threshold: f64,
    /// Edge threshold for detection.
    pub edge_threshold: f64,
    /// Estimate oriented ellipses instead of oriented disks.
    pub estimate_affine_shape: bool,
    /// Orientations per keypoint when not estimating affine shape.
    pub max_num_orientations: i32,
    /// Fix the orientation to 0.
    pub upright: bool,
    /// Adapt detection to image darkness (GPU only).
    pub darkness_adaptivity: bool,
    /// Pool descriptors over several scales.
    pub domain_size_pooling: bool,
    /// Smallest pooling scale.
    pub dsp_min_scale: f64,
    /// Largest pooling scale.
    pub dsp_max_scale: f64,
    /// Number of pooling scales.
    pub dsp_num_scales: i32,
    /// Descriptor normalization.
    pub normalization: DescriptorNormalization,
}

impl Default for SiftExtractionOptions {
    fn default() -> Self {
        Self {
            use_gpu: true,
            max_num_features: 8192,
            first_octave: -1,
            num_octaves: 4,
            octave_resolution: 3,
            peak_threshold: 0.02 / 3.0,
            edge_threshold: 10.0,
            estimate_affine_shape: false,
            max_num_orientations: 2,
            upright: false,
            darkness_adaptivity: false,
            domain_size_pooling: false,
            dsp_min_scale: 1.0 / 6.0,
            dsp_max_scale: 3.0,
            dsp_num_scales: 10,
            normalization: DescriptorNormalization::L1Root,
        }
    }
}

impl SiftExtractionOptions {
    /// Returns the `--SiftExtraction.*` arguments.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        ArgList::section("SiftExtraction")
            .flag("use_gpu", self.use_gpu)
            .value("max_num_features", self.max_num_features)
            .value("first_octave", self.first_octave)
            .value("num_octaves", self.num_octaves)
            .value("octave_resolution", self.octave_resolution)
            .value("peak_threshold", self.peak_threshold)
            .value("edge_threshold", self.edge_threshold)
            .flag("estimate_affine_shape", self.estimate_affine_shape)
            .value("max_num_orientations", self.max_num_orientations)
            .flag("upright", self.upright)
            .flag("darkness_adaptivity", self.darkness_adaptivity)
            .flag("domain_size_pooling", self.domain_size_pooling)
            .value("dsp_min_scale", self.dsp_min_scale)
            .value("dsp_max_scale", self.dsp_max_scale)
            .value("dsp_num_scales", self.dsp_num_scales)
            .value("normalization", self.normalization.as_str())
            .finish()
    }
}

/// Everything `colmap feature_extractor` takes besides paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// How cameras are shared between images.
    pub camera_mode: CameraMode,
    /// SIFT detection and description.
    pub sift: SiftExtractionOptions,
}

impl ExtractOptions {
    /// Returns the camera mode and SIFT arguments.
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        let mut args = self.camera_mode.arguments();
        args.extend(self.sift.arguments());
        args
    }
}
