//! Running pipeline stages with live progress.
//!
//! Every stage is started through a [`UiBridge`] that polls it on a timer and
//! refreshes the project's cached statistics once it finishes, whether it
//! succeeded or not.

use crate::config::Session;
use crate::display::TerminalView;
use anyhow::{Context, Result, bail};
use reconbridge_colmap::{ExtractFeatures, GlomapSolve, MatchFeatures, Matcher, Solve, Tool};
use reconbridge_jobs::{JobId, JobOutcome, UiBridge};
use reconbridge_project::Project;

/// One step of the reconstruction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Extract,
    Match,
    Solve,
    GlomapSolve,
}

impl Stage {
    /// Returns the full pipeline, solved with the chosen mapper.
    pub(crate) const fn pipeline(glomap: bool) -> [Self; 3] {
        [Self::Extract, Self::Match, Self::solve(glomap)]
    }

    pub(crate) const fn solve(glomap: bool) -> Self {
        if glomap { Self::GlomapSolve } else { Self::Solve }
    }

    const fn tool(self) -> Tool {
        match self {
            Self::GlomapSolve => Tool::Glomap,
            _ => Tool::Colmap,
        }
    }
}

/// Runs `stages` one after another, stopping at the first failure.
pub(crate) async fn run_stages(
    session: &Session,
    stages: &[Stage],
    matcher: Option<Matcher>,
) -> Result<()> {
    let mut bridge = UiBridge::new(session.registry.clone(), TerminalView::new(session.quiet))
        .with_log_sink(session.sink.clone())
        .with_poll_interval(session.poll_period);

    for &stage in stages {
        let id = start_stage(&mut bridge, session, stage, matcher)?;
        let outcomes = bridge.run().await;
        let outcome = outcomes
            .into_iter()
            .find(|outcome| outcome.id == id)
            .context("Job vanished before it finished")?;

        if let Some(error) = &outcome.error {
            bail!(
                "{} failed: {error}\nTool output: {}",
                outcome.label,
                session.sink.path().display()
            );
        }
    }

    Ok(())
}

fn start_stage(
    bridge: &mut UiBridge<TerminalView>,
    session: &Session,
    stage: Stage,
    matcher: Option<Matcher>,
) -> Result<JobId> {
    let program = session.toolchain.resolve(stage.tool())?;
    let layout = session.project.layout().clone();
    let settings = &session.settings;
    let on_finished = refresh_stats(session.project.clone());

    let id = match stage {
        Stage::Extract => bridge.start(
            &ExtractFeatures::new(program, layout, settings.extract.clone()),
            on_finished,
        ),
        Stage::Match => {
            let mut options = settings.matching.clone();
            if let Some(matcher) = matcher {
                options.matcher = matcher;
            }
            bridge.start(&MatchFeatures::new(program, layout, options), on_finished)
        }
        Stage::Solve => bridge.start(
            &Solve::new(program, layout, settings.mapper.clone()),
            on_finished,
        ),
        Stage::GlomapSolve => bridge.start(
            &GlomapSolve::new(program, layout, settings.glomap.clone()),
            on_finished,
        ),
    }?;

    Ok(id)
}

/// Builds the on-finished hook that re-reads the project database.
fn refresh_stats(project: Project) -> impl FnOnce(&JobOutcome) + 'static {
    move |outcome| match project.refresh_stats() {
        Ok(stats) => tracing::info!(
            job_id = %outcome.id,
            images = stats.images,
            descriptors = stats.descriptors,
            verified_pairs = stats.verified_image_pairs,
            "Refreshed project stats"
        ),
        Err(e) => tracing::warn!(job_id = %outcome.id, error = %e, "Failed to refresh project stats"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stages() {
        assert_eq!(
            Stage::pipeline(false),
            [Stage::Extract, Stage::Match, Stage::Solve]
        );
        assert_eq!(Stage::pipeline(true)[2], Stage::GlomapSolve);
        assert_eq!(Stage::GlomapSolve.tool(), Tool::Glomap);
        assert_eq!(Stage::Match.tool(), Tool::Colmap);
    }
}
