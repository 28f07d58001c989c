//! reconbridge CLI - COLMAP and GLOMAP camera tracking with live progress.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use reconbridge_colmap::Matcher;

mod commands;
mod config;
mod display;

use commands::clear::ClearTarget;
use commands::run::Stage;
use config::{GlobalArgs, Session};

#[derive(Parser)]
#[command(name = "reconbridge")]
#[command(about = "Camera tracking with COLMAP and GLOMAP", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract features from the image sequence
    Extract,

    /// Match features between images
    Match {
        /// Matching strategy (exhaustive, spatial, vocab_tree, sequential).
        /// Defaults to the project settings.
        #[arg(short, long)]
        matcher: Option<Matcher>,
    },

    /// Solve cameras and points from the matched features
    Solve {
        /// Use the GLOMAP global mapper instead of COLMAP's incremental one
        #[arg(long)]
        glomap: bool,
    },

    /// Extract, match and solve in one go, stopping at the first failure
    Pipeline {
        /// Solve with the GLOMAP global mapper
        #[arg(long)]
        glomap: bool,

        /// Matching strategy. Defaults to the project settings.
        #[arg(short, long)]
        matcher: Option<Matcher>,
    },

    /// Show feature and match statistics of the project database
    Stats {
        /// Print the last cached values without reading the database
        #[arg(long)]
        cached: bool,
    },

    /// Clear pipeline results
    Clear {
        /// What to clear
        #[arg(value_enum)]
        target: ClearTarget,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show the project's pipeline settings
    Settings {
        /// Restore the default settings
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    config::init_tracing(cli.global.verbose, cli.global.quiet);

    match command {
        Commands::Extract => run(&cli.global, &[Stage::Extract], None).await,
        Commands::Match { matcher } => run(&cli.global, &[Stage::Match], matcher).await,
        Commands::Solve { glomap } => run(&cli.global, &[Stage::solve(glomap)], None).await,
        Commands::Pipeline { glomap, matcher } => {
            run(&cli.global, &Stage::pipeline(glomap), matcher).await
        }
        Commands::Stats { cached } => {
            commands::stats::stats(&config::open_project(&cli.global)?, cached)
        }
        Commands::Clear { target, yes } => {
            commands::clear::clear(&config::open_project(&cli.global)?, target, yes)
        }
        Commands::Settings { reset } => {
            commands::settings::settings(&config::open_project(&cli.global)?, reset)
        }
    }
}

async fn run(global: &GlobalArgs, stages: &[Stage], matcher: Option<Matcher>) -> Result<()> {
    let session = Session::open(global)?;
    commands::run::run_stages(&session, stages, matcher).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pipeline_with_globals() {
        let cli = Cli::parse_from([
            "reconbridge",
            "pipeline",
            "--glomap",
            "--matcher",
            "vocab-tree",
            "--project",
            "/tmp/shot",
            "-vv",
        ]);

        let Some(Commands::Pipeline { glomap, matcher }) = cli.command else {
            panic!("expected the pipeline command");
        };
        assert!(glomap);
        assert_eq!(matcher, Some(Matcher::VocabTree));
        assert_eq!(cli.global.verbose, 2);
    }

    #[test]
    fn test_parse_clear() {
        let cli = Cli::parse_from(["reconbridge", "clear", "matches", "--yes"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Clear {
                target: ClearTarget::Matches,
                yes: true
            })
        ));
    }
}
