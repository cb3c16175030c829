use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use milkdash_lib::config::Config;
use milkdash_lib::ingest::MergePolicy;
use milkdash_lib::predict::PredictionView;
use milkdash_lib::utils::logging;

#[derive(Parser)]
#[command(name = "milkdash", version, about = "Milk quality dashboard server and clients")]
struct Cli {
    /// Debug logging for this crate (same as MILKDASH_DEBUG=1).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard assets, the metric stream and /predict.
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        assets_dir: Option<PathBuf>,
        /// Broadcast only the newest row each tick instead of the whole window.
        #[arg(long)]
        incremental: bool,
    },
    /// Follow a server's stream with terminal charts and the correlation table.
    Watch {
        #[arg(long, env = "MILKDASH_ENDPOINT")]
        endpoint: Option<String>,
        /// Accumulate up to this many rows instead of replacing on each payload.
        #[arg(long)]
        append: Option<usize>,
    },
    /// Ask /predict for the viscosity at the given inputs.
    Predict {
        #[arg(long, env = "MILKDASH_PREDICT_URL")]
        url: Option<String>,
        elapsed_time: f64,
        velocity: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    logging::init(cli.verbose || config.debug);

    log::info!("milkdash starting up...");

    match cli.command {
        Commands::Serve {
            port,
            assets_dir,
            incremental,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = assets_dir {
                config.server.assets_dir = dir;
            }
            if incremental {
                config.server.send_full_window = false;
            }
            milkdash_lib::server::serve(config.server, shutdown_on_ctrl_c()).await
        }
        Commands::Watch { endpoint, append } => {
            if let Some(endpoint) = endpoint {
                config.client.endpoint = endpoint;
            }
            if let Some(capacity) = append {
                config.client.merge_policy = MergePolicy::Append { capacity };
            }
            milkdash_lib::watch(config.client, shutdown_on_ctrl_c()).await
        }
        Commands::Predict {
            url,
            elapsed_time,
            velocity,
        } => {
            let url = url.unwrap_or(config.client.predict_url);
            match milkdash_lib::predict(&url, elapsed_time, velocity).await? {
                PredictionView::Ready {
                    prediction,
                    quality,
                } => {
                    println!("Predicted Viscosity: {prediction:.2} ({})", quality.label());
                    Ok(())
                }
                PredictionView::Failed { message } => bail!("Error making prediction: {message}"),
                other => bail!("prediction did not complete: {other:?}"),
            }
        }
    }
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("shutting down");
                trigger.cancel();
            }
            Err(err) => log::warn!("Ctrl+C handler unavailable: {err}"),
        }
    });
    token
}
