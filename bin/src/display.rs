//! Terminal progress display for running jobs.

use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reconbridge_jobs::{JobId, JobOutcome, JobRunner, JobSnapshot, ProgressView};
use reconbridge_project::CachedStats;
use std::collections::HashMap;
use std::time::Duration;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .expect("Invalid progress template")
        .progress_chars("=>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.green} [{elapsed_precise}] {msg}")
        .expect("Invalid progress template")
}

#[derive(Debug)]
struct JobBar {
    bar: ProgressBar,
    determinate: bool,
}

/// Draws one progress line per running job.
///
/// Shows a spinner until the job reports a total, then a bar.
#[derive(Debug)]
pub(crate) struct TerminalView {
    multi: MultiProgress,
    bars: HashMap<JobId, JobBar>,
    quiet: bool,
}

impl TerminalView {
    pub(crate) fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        Self {
            multi,
            bars: HashMap::new(),
            quiet,
        }
    }

    fn println(&self, line: &str) {
        if self.quiet {
            return;
        }
        if let Err(e) = self.multi.println(line) {
            tracing::debug!(error = %e, "Failed to print above progress bars");
        }
    }
}

impl ProgressView for TerminalView {
    fn job_started(&mut self, runner: &JobRunner) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_prefix(runner.label().to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        self.bars.insert(
            runner.id(),
            JobBar {
                bar,
                determinate: false,
            },
        );
    }

    fn job_progress(&mut self, id: JobId, snapshot: &JobSnapshot) {
        let Some(job) = self.bars.get_mut(&id) else {
            return;
        };

        if !snapshot.is_indeterminate() {
            if !job.determinate {
                job.bar.disable_steady_tick();
                job.bar.set_style(bar_style());
                job.determinate = true;
            }
            job.bar.set_length(snapshot.total);
            job.bar.set_position(snapshot.current);
        }
        job.bar.set_message(snapshot.message.clone());
    }

    fn job_finished(&mut self, outcome: &JobOutcome) {
        let elapsed = HumanDuration(outcome.elapsed().to_std().unwrap_or_default());

        if let Some(job) = self.bars.remove(&outcome.id) {
            match &outcome.error {
                None => job.bar.finish_with_message(format!("done in {elapsed}")),
                Some(error) => job.bar.abandon_with_message(error.to_string()),
            }
        }

        match &outcome.error {
            None => self.println(&format!("{} finished in {elapsed}", outcome.label)),
            Some(error) => self.println(&format!("{} failed: {error}", outcome.label)),
        }
    }

    fn warn(&mut self, message: &str) {
        self.println(&format!("warning: {message}"));
    }
}

/// Prints cached database statistics.
pub(crate) fn print_stats(stats: &CachedStats) {
    println!("Images:                {}", stats.images);
    println!("Descriptors:           {}", stats.descriptors);
    println!("Matches:               {}", stats.matches);
    println!("Inlier matches:        {}", stats.inlier_matches);
    println!("Matched image pairs:   {}", stats.matched_image_pairs);
    println!("Verified image pairs:  {}", stats.verified_image_pairs);
    if let Some(ratio) = stats.inliers_per_pair() {
        println!("Inliers per pair:      {ratio:.1}");
    }
    if let Some(at) = stats.refreshed_at {
        println!("Refreshed:             {}", at.format("%Y-%m-%d %H:%M:%S"));
    }
}
