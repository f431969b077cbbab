//! CLI Entry Point for frelon-ccd
//!
//! Drives the Frelon command translator against a simulated acquisition
//! engine:
//! - `exec` runs one JSON command and prints its reply
//! - `serve` reads JSON commands from stdin, one per line, and prints one
//!   reply line per command
//!
//! # Usage
//!
//! ```bash
//! frelon-ccd exec '{"cmd": "setBinning", "args": [2, 2]}'
//! echo '{"cmd": "queryStatusText"}' | frelon-ccd serve
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use frelon_ccd::command::execute_line;
use frelon_ccd::config::{FrelonConfig, DEFAULT_CONFIG_PATH};
use frelon_ccd::hardware::MockEngine;
use frelon_ccd::translator::FrelonTranslator;
use frelon_ccd::tracing_setup;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "frelon-ccd")]
#[command(about = "Frelon CCD command translator on a simulated camera", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single JSON command
    Exec {
        /// Command, e.g. '{"cmd": "getRoi"}'
        command: String,
    },

    /// Read JSON commands from stdin until end of input
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FrelonConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    config.validate()?;
    tracing_setup::init_from_config(&config)?;

    info!(
        device = %config.device.name,
        espia_dev_nb = config.device.espia_dev_nb,
        "Using simulated camera {} ({}x{}, {} bits)",
        config.simulator.model,
        config.simulator.sensor_width,
        config.simulator.sensor_height,
        config.simulator.adc_bits
    );
    let engine = Arc::new(MockEngine::with_sensor(config.simulator.sensor()));
    let translator = FrelonTranslator::new(engine);

    match cli.command {
        Commands::Exec { command } => {
            let reply = execute_line(&translator, &command).await;
            println!("{}", reply);
            Ok(())
        }
        Commands::Serve => serve(&translator).await,
    }
}

async fn serve(translator: &FrelonTranslator) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = execute_line(translator, line).await;
        stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("End of input, shutting down");
    Ok(())
}
