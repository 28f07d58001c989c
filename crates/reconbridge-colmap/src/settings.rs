//! Per-project pipeline settings.

use crate::options::{ExtractOptions, GlomapOptions, MapperOptions, MatchOptions};
use reconbridge_project::{JsonStore, ProjectLayout};
use serde::{Deserialize, Serialize};

/// Every option group of the pipeline, persisted as `settings.json`.
///
/// Missing fields take their defaults, so settings files written by older
/// versions keep loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Feature extraction.
    pub extract: ExtractOptions,
    /// Feature matching.
    pub matching: MatchOptions,
    /// Incremental mapper.
    pub mapper: MapperOptions,
    /// Global mapper.
    pub glomap: GlomapOptions,
}

impl PipelineSettings {
    /// Returns the store holding the settings of the project at `layout`.
    #[must_use]
    pub fn store(layout: &ProjectLayout) -> JsonStore<Self> {
        JsonStore::new(layout.settings_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Matcher;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_through_project() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp_dir.path());
        let store = PipelineSettings::store(&layout);

        let mut settings = store.load().unwrap();
        assert_eq!(settings, PipelineSettings::default());

        settings.matching.matcher = Matcher::Sequential;
        settings.glomap.use_gpu = false;
        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap(), settings);
        assert!(layout.settings_path().exists());
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings: PipelineSettings =
            serde_json::from_str(r#"{"matching": {"matcher": "vocab_tree"}}"#).unwrap();

        assert_eq!(settings.matching.matcher, Matcher::VocabTree);
        assert_eq!(settings.matching.exhaustive.block_size, 50);
        assert_eq!(settings.extract, ExtractOptions::default());
    }
}
