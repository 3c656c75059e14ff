//! DRA CLI - Command-line interface
//!
//! Usage:
//!   dra run [--token T] [--format table|json] [--watch --interval SECS]
//!   dra classify <text>
//!   dra extract <text>
//!   dra geocode <address>
//!   dra guide

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dra_channel::{ChannelSession, TelegramClient};
use dra_classifier::create_classifier;
use dra_core::{guide, AppConfig, Geocoder, TextClassifier};
use dra_extractor::Extractor;
use dra_pipeline::{render_table, NominatimGeocoder, Pipeline, RunReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dra")]
#[command(about = "Telegram Disaster Recovery Assistant CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(long, global = true, env = "DRA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new channel posts and print the disaster table
    Run {
        /// Telegram bot token
        #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
        token: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Keep polling with the same session
        #[arg(long)]
        watch: bool,

        /// Seconds between polls in watch mode
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
    /// Classify a single text
    Classify {
        /// Text to classify
        text: String,
    },
    /// Extract entities from a single text
    Extract {
        /// Text to analyze
        text: String,
    },
    /// Resolve an address to coordinates
    Geocode {
        /// Free-form address
        address: String,
    },
    /// Print the bot setup guide
    Guide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("warn,dra={}", config.logging.level).into());
    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_report(report: &RunReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_table(&report.table));
            for diagnostic in &report.diagnostics {
                eprintln!("warning: {diagnostic}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}

async fn run(
    config: &AppConfig,
    token: &str,
    format: OutputFormat,
    watch: bool,
    interval: u64,
) -> anyhow::Result<()> {
    let token = token.trim();
    anyhow::ensure!(!token.is_empty(), "bot token cannot be empty");

    let pipeline = Pipeline::from_config(config)?;
    let client = TelegramClient::from_config(token, &config.telegram, &config.http)?;
    let mut session = ChannelSession::new(Arc::new(client));

    loop {
        let report = pipeline.run(&mut session).await;
        print_report(&report, format)?;

        if !watch {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("stopping watch");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.clone()).context("failed to load configuration")?;
    init_tracing(&config);

    match cli.command {
        Commands::Run {
            token,
            format,
            watch,
            interval,
        } => run(&config, &token, format, watch, interval).await?,
        Commands::Classify { text } => {
            let classifier = create_classifier(&config.classifier, &config.http)?;
            let result = classifier.classify(&text).await?;
            println!(
                "{} (model label {}, score {:.3})",
                result.label, result.raw_label, result.score
            );
        }
        Commands::Extract { text } => {
            let extractor = Extractor::from_config(&config)?;
            let record = extractor.try_extract(&text).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Geocode { address } => {
            let geocoder = NominatimGeocoder::from_config(&config.geocoder, &config.http)?;
            match geocoder.geocode(&address).await? {
                Some(coordinates) => println!("{coordinates}"),
                None => println!("not found"),
            }
        }
        Commands::Guide => print!("{}", guide::render_text()),
    }

    Ok(())
}
