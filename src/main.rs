//! branchscope command-line entry point.

use anyhow::{Context, Result};
use branchscope::adapters::GitCli;
use branchscope::compare::BranchComparer;
use branchscope::config::Settings;
use branchscope::report::{self, ReportOptions};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "branchscope")]
#[command(about = "Review-friendly comparison of two git branches")]
#[command(version)]
struct Args {
    /// Path to git repository (default: current directory)
    #[arg(short = 'C', long, global = true)]
    path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare SOURCE (the changed branch) against TARGET (the base)
    Compare {
        source: String,
        target: String,

        /// Emit the result as JSON instead of markdown
        #[arg(long)]
        json: bool,

        /// Append per-file diffs to the markdown report
        #[arg(long)]
        include_diff: bool,

        /// Files resolved at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Context lines for per-file diff retries
        #[arg(long)]
        context_lines: Option<usize>,

        /// Skip moved-line detection
        #[arg(long)]
        no_moves: bool,
    },
    /// List local branches
    Branches,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BRANCHSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut settings = Settings::load();

    let timeout = Duration::from_secs(settings.command_timeout_secs);
    let git = if let Some(path) = &args.path {
        GitCli::open(Path::new(path), timeout)
    } else {
        GitCli::open_current_dir(timeout)
    }
    .context("Failed to open git repository. Are you in a git directory?")?;
    tracing::debug!(root = %git.root().display(), "repository opened");

    match args.command {
        Command::Branches => {
            let comparer = BranchComparer::from_settings(git, &settings);
            for branch in comparer.list_branches().await? {
                let marker = if branch.is_current { "*" } else { " " };
                println!("{} {}", marker, branch.name);
            }
        }
        Command::Compare {
            source,
            target,
            json,
            include_diff,
            concurrency,
            context_lines,
            no_moves,
        } => {
            if let Some(n) = concurrency {
                settings.concurrency = n.max(1);
            }
            if let Some(n) = context_lines {
                settings.context_lines = n;
            }
            if no_moves {
                settings.detect_moves = false;
            }
            settings.include_diff |= include_diff;

            let comparer = BranchComparer::from_settings(git, &settings);
            let result = comparer
                .compare(&source, &target)
                .await
                .with_context(|| format!("Failed to compare '{}' against '{}'", source, target))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let options = ReportOptions {
                    include_diff: settings.include_diff,
                };
                print!("{}", report::render_markdown(&result, options));
            }
        }
    }

    Ok(())
}
