//! Clearing pipeline results from a project.

use crate::display::print_stats;
use anyhow::{Context, Result};
use clap::ValueEnum;
use inquire::Confirm;
use reconbridge_project::Project;

/// What to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ClearTarget {
    /// Extracted keypoints, descriptors and camera records
    Features,
    /// Feature matches and verified pairs
    Matches,
    /// Solved sparse models
    Reconstruction,
    /// The image sequence
    Images,
    /// All of the above
    All,
}

impl ClearTarget {
    const fn description(self) -> &'static str {
        match self {
            Self::Features => "all extracted features",
            Self::Matches => "all feature matches",
            Self::Reconstruction => "the reconstruction",
            Self::Images => "the image sequence",
            Self::All => "the whole project",
        }
    }
}

/// Clears `target`, asking first unless `yes`.
pub(crate) fn clear(project: &Project, target: ClearTarget, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new(&format!("Clear {}?", target.description()))
            .with_default(false)
            .prompt()
            .context("Confirmation cancelled")?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let stats = match target {
        ClearTarget::Features => Some(project.clear_feature_extraction()?),
        ClearTarget::Matches => Some(project.clear_feature_matches()?),
        ClearTarget::Reconstruction => {
            project.clear_reconstruction()?;
            None
        }
        ClearTarget::Images => {
            project.clear_images()?;
            None
        }
        ClearTarget::All => Some(project.clear_all()?),
    };

    println!("Cleared {}.", target.description());
    if let Some(stats) = stats {
        print_stats(&stats);
    }
    Ok(())
}
