mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{ConfigArgs, LayerArgs};

#[derive(Parser)]
#[command(name = "layerpack", about = "Build and publish AWS Lambda layers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a dependency layer from a requirements file and publish it
    Build {
        #[command(flatten)]
        layer: LayerArgs,
        /// Layer name registered with AWS Lambda
        #[arg(long)]
        name: Option<String>,
        /// Requirements file to install
        #[arg(long, short = 'r', value_name = "FILE")]
        requirements: Option<PathBuf>,
        /// Layer version description
        #[arg(long)]
        description: Option<String>,
        /// Build the archive without publishing it
        #[arg(long)]
        no_publish: bool,
    },
    /// Build the headless Chrome layer and its Selenium dependency layer
    Browser {
        #[command(flatten)]
        layer: LayerArgs,
        /// Chrome for Testing version used to derive download URLs
        #[arg(long, value_name = "VERSION")]
        chrome_version: Option<String>,
        /// Download URL of the chrome archive
        #[arg(long, value_name = "URL")]
        chrome_url: Option<String>,
        /// Download URL of the chromedriver archive
        #[arg(long, value_name = "URL")]
        chromedriver_url: Option<String>,
    },
    /// Show the AWS identity behind the current credentials
    Whoami {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            layer,
            name,
            requirements,
            description,
            no_publish,
        } => commands::build(&layer, requirements, name, description, no_publish).await?,
        Commands::Browser {
            layer,
            chrome_version,
            chrome_url,
            chromedriver_url,
        } => commands::browser(&layer, chrome_version, chrome_url, chromedriver_url).await?,
        Commands::Whoami { config } => commands::whoami(&config).await?,
    }

    Ok(())
}
