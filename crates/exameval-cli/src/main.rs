//! exameval CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::Directive;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "exameval", version, about = "Rule-based exam grading engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade submitted exam attempts
    Grade {
        /// Path to the exam .toml file
        #[arg(long)]
        exam: PathBuf,

        /// Path to the submissions JSON (array of attempts)
        #[arg(long)]
        attempts: PathBuf,

        /// Matching mode: strict or flexible (default from config)
        #[arg(long)]
        mode: Option<String>,

        /// Max attempts graded concurrently (default from config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two grading reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Minimum point change to report
        #[arg(long, default_value = "1")]
        threshold: u32,

        /// Exit code 1 if any attempt lost points
        #[arg(long)]
        fail_on_lowered: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate exam TOML files
    Validate {
        /// Path to exam file or directory
        #[arg(long)]
        exam: PathBuf,
    },

    /// Print a saved grading report
    Summary {
        /// Report JSON
        #[arg(long)]
        report: PathBuf,

        /// Output format: text, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create starter config, example exam, and submissions
    Init,
}

fn default_directive() -> Directive {
    "exameval=info"
        .parse()
        .unwrap_or_else(|_| Directive::from(tracing::Level::INFO))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            exam,
            attempts,
            mode,
            parallelism,
            output,
            config,
        } => commands::grade::execute(exam, attempts, mode, parallelism, output, config).await,
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_lowered,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_lowered, format),
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Summary { report, format } => commands::summary::execute(report, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
