//! Statistics cached from the database for quick display.

use crate::database::DatabaseCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database statistics as last refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachedStats {
    /// Registered images.
    pub images: u64,
    /// Feature descriptors over all images.
    pub descriptors: u64,
    /// Raw feature matches.
    pub matches: u64,
    /// Geometrically verified matches.
    pub inlier_matches: u64,
    /// Image pairs with raw matches.
    pub matched_image_pairs: u64,
    /// Image pairs with verified matches.
    pub verified_image_pairs: u64,
    /// When the values were read; `None` if never refreshed.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl CachedStats {
    /// Stamps a set of counts with the current time.
    #[must_use]
    pub fn from_counts(counts: DatabaseCounts) -> Self {
        Self {
            images: counts.images,
            descriptors: counts.descriptors,
            matches: counts.matches,
            inlier_matches: counts.inlier_matches,
            matched_image_pairs: counts.matched_image_pairs,
            verified_image_pairs: counts.verified_image_pairs,
            refreshed_at: Some(Utc::now()),
        }
    }

    /// Mean verified matches per verified pair.
    #[must_use]
    pub fn inliers_per_pair(&self) -> Option<f64> {
        (self.verified_image_pairs > 0)
            .then(|| self.inlier_matches as f64 / self.verified_image_pairs as f64)
    }
}
