use std::io::Read;

use anyhow::{Context, Result};
use cerebro::models::config::CerebroConfig;
use cerebro::models::signal::MarketSignal;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Plan/act/observe loop over the language model and tools
    Flow,
    /// Multi-role analysis with decision generation and approval gating
    Enhanced,
}

#[derive(Parser, Debug)]
#[command(name = "cerebro", about = "Trading analysis orchestrator")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/cerebro.toml")]
    config: String,

    /// Query to analyze; read from stdin when omitted
    #[arg(short, long, conflicts_with = "signal")]
    query: Option<String>,

    /// Analyze a MarketSignal JSON file instead of a query
    #[arg(short, long)]
    signal: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Mode::Enhanced)]
    mode: Mode,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable (respects RUST_LOG)
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: CerebroConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    let analyst = cerebro::build_analyst(&config)
        .await
        .context("Failed to build analyst")?;

    if let Some(path) = &cli.signal {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read signal: {path}"))?;
        let signal: MarketSignal =
            serde_json::from_str(&json).context("Failed to parse MarketSignal JSON")?;
        let response = analyst.handle_signal(&signal).await;
        print_json(&response, cli.pretty)?;
    } else {
        let query = match &cli.query {
            Some(query) => query.clone(),
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read from stdin")?;
                buf.trim().to_string()
            }
        };
        anyhow::ensure!(!query.is_empty(), "Query is empty");

        match cli.mode {
            Mode::Flow => {
                let response = analyst.analyze(&query, serde_json::json!({})).await;
                print_json(&response, cli.pretty)?;
            }
            Mode::Enhanced => {
                let response = analyst.enhanced_analysis(&query, serde_json::json!({})).await;
                print_json(&response, cli.pretty)?;
            }
        }
    }

    analyst.shutdown().await;
    Ok(())
}
