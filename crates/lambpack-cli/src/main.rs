mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lambpack",
    about = "Package Python apps into AWS Lambda deployment zips"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build lambda-deployment.zip from the working directory
    Package {
        /// Directory containing requirements.txt and the application files
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Check that the working directory and container runtime are ready
    Doctor {
        /// Directory containing requirements.txt and the application files
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Package { root } => commands::package(&root)?,
        Commands::Doctor { root } => commands::doctor(&root)?,
    }

    Ok(())
}
