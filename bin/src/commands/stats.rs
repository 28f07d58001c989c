//! Project statistics command.

use crate::display::print_stats;
use anyhow::{Context, Result};
use reconbridge_project::Project;

/// Prints the project's database statistics, re-reading them unless `cached`.
pub(crate) fn stats(project: &Project, cached: bool) -> Result<()> {
    let stats = if cached {
        project.cached_stats().context("Failed to read cached stats")?
    } else {
        project.refresh_stats().context("Failed to refresh stats")?
    };

    println!("Project: {}", project.layout().root().display());
    println!("Frames:                {}", project.layout().frame_count()?);
    print_stats(&stats);
    Ok(())
}
