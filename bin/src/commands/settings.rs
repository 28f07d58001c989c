//! Pipeline settings command.

use anyhow::{Context, Result};
use reconbridge_colmap::PipelineSettings;
use reconbridge_project::Project;

/// Prints the project's pipeline settings, resetting them first if asked.
pub(crate) fn settings(project: &Project, reset: bool) -> Result<()> {
    let store = PipelineSettings::store(project.layout());

    let settings = if reset {
        let settings = store.reset().context("Failed to reset settings")?;
        tracing::info!(path = %store.path().display(), "Reset pipeline settings");
        settings
    } else {
        store.load().context("Failed to load settings")?
    };

    println!("# {}", store.path().display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconbridge_colmap::Matcher;
    use reconbridge_project::ProjectLayout;
    use tempfile::TempDir;

    #[test]
    fn test_reset_restores_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::open(ProjectLayout::new(temp_dir.path())).unwrap();
        let store = PipelineSettings::store(project.layout());

        let mut custom = PipelineSettings::default();
        custom.matching.matcher = Matcher::Sequential;
        store.save(&custom).unwrap();

        settings(&project, true).unwrap();
        assert_eq!(store.load().unwrap(), PipelineSettings::default());
    }
}
