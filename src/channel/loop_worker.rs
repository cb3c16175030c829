use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::metrics::wire::decode_frame;

use super::state::{ChannelEvent, ConnectionStatus, ReconnectPolicy, ReconnectTracker};
use super::transport::{Connection, Transport};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// How a live connection ended.
enum ReadOutcome {
    Dropped,
    Cancelled,
}

/// Drives one channel: connect, pump frames, retry within the policy, give up.
/// Returns when retries are exhausted, the receiver is gone, or `cancel` fires.
pub async fn channel_loop(
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    events: UnboundedSender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let endpoint = transport.endpoint().to_string();
    let mut tracker = ReconnectTracker::new(policy);

    loop {
        let attempt = tokio::select! {
            result = transport.connect() => result,
            _ = cancel.cancelled() => break,
        };

        match attempt {
            Ok(mut connection) => {
                tracker.on_connected();
                log_info!("channel connected to {}", endpoint);
                if !emit(&events, &cancel, ChannelEvent::Connected) {
                    let _ = connection.close().await;
                    break;
                }
                tracker.announce(ConnectionStatus::Connected);

                match pump_frames(connection.as_mut(), &events, &cancel).await {
                    ReadOutcome::Cancelled => {
                        if let Err(err) = connection.close().await {
                            log_debug!("channel close after cancel: {err:#}");
                        }
                        break;
                    }
                    ReadOutcome::Dropped => {
                        log_warn!("channel to {} dropped", endpoint);
                        if !emit(&events, &cancel, ChannelEvent::Disconnected) {
                            break;
                        }
                        tracker.announce(ConnectionStatus::Disconnected);
                    }
                }
            }
            Err(err) => {
                log_warn!(
                    "channel connect failed (retry {}/{}): {err:#}",
                    tracker.retries_used(),
                    policy.attempts
                );
            }
        }

        let Some(delay) = tracker.next_delay() else {
            log_warn!(
                "giving up on {} after {} retries; manual reconnect required",
                endpoint,
                policy.attempts
            );
            if tracker.owes_disconnect() {
                emit(&events, &cancel, ChannelEvent::Disconnected);
            }
            break;
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => break,
        }
    }

    log_debug!("channel loop for {} finished", endpoint);
}

async fn pump_frames(
    connection: &mut dyn Connection,
    events: &UnboundedSender<ChannelEvent>,
    cancel: &CancellationToken,
) -> ReadOutcome {
    loop {
        let frame = tokio::select! {
            frame = connection.next_frame() => frame,
            _ = cancel.cancelled() => return ReadOutcome::Cancelled,
        };

        match frame {
            Some(Ok(text)) => match decode_frame(&text) {
                Ok(Some(payload)) => {
                    if !emit(events, cancel, ChannelEvent::Data(payload)) {
                        return ReadOutcome::Cancelled;
                    }
                }
                Ok(None) => {}
                Err(err) => log_warn!("skipping malformed frame: {err:#}"),
            },
            Some(Err(err)) => {
                log_warn!("channel read error: {err:#}");
                return ReadOutcome::Dropped;
            }
            None => return ReadOutcome::Dropped,
        }
    }
}

/// Nothing is delivered once the channel has been closed.
fn emit(
    events: &UnboundedSender<ChannelEvent>,
    cancel: &CancellationToken,
    event: ChannelEvent,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    events.send(event).is_ok()
}
