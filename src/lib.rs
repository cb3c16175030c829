pub mod channel;
pub mod charts;
pub mod config;
pub mod correlation;
pub mod ingest;
pub mod metrics;
pub mod predict;
pub mod server;
pub mod session;
pub mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use channel::WebSocketTransport;
use charts::TerminalSurface;
use config::ClientConfig;
use predict::{PredictionClient, PredictionForm, PredictionView};
use session::{DashboardSession, SessionOptions, SessionUpdate};

/// Runs one headless dashboard session against `config.endpoint` until
/// `shutdown` fires. Every repaint logs the newest correlation row; the full
/// table goes to the debug log.
pub async fn watch(config: ClientConfig, shutdown: CancellationToken) -> Result<()> {
    let transport = Arc::new(WebSocketTransport::new(config.endpoint.clone()));
    let mut surfaces = TerminalSurface::new(config.chart_width);
    let mut session = DashboardSession::open(
        transport,
        &mut surfaces,
        SessionOptions {
            reconnect: config.reconnect,
            merge_policy: config.merge_policy,
        },
    )?;

    info!("watching {} as session {}", config.endpoint, session.id());

    loop {
        let step = tokio::select! {
            _ = shutdown.cancelled() => break,
            step = session.step() => step,
        };
        let Some(update) = step else { break };

        match update {
            Ok(SessionUpdate::Status(status)) => info!("status: {}", status.label()),
            Ok(SessionUpdate::Window { rows, dropped }) => {
                log::debug!("window holds {rows} rows ({dropped} dropped)");
                for row in session.table() {
                    log::debug!("  {}", row.describe());
                }
                if let Some(latest) = session.table().last() {
                    info!("{}", latest.describe());
                }
            }
            Err(err) => warn!("update failed: {err:#}"),
        }
    }

    session.close().await;
    info!("session {} closed", session.id());
    Ok(())
}

/// Submits the prediction form once and returns what it shows.
pub async fn predict(url: &str, elapsed_time: f64, velocity: f64) -> Result<PredictionView> {
    let mut form = PredictionForm::new(PredictionClient::new(url)?);
    Ok(form.submit(elapsed_time, velocity).await.clone())
}
