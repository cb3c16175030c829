use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::channel_loop;
use super::state::{ChannelEvent, ReconnectPolicy};
use super::transport::Transport;

/// Owns the push channel of one session.
///
/// Events arrive on the receiver handed out by [`ChannelManager::open`], one at
/// a time and in order. The manager never buffers on its own account: frames
/// that arrive while no connection exists are simply never seen.
pub struct ChannelManager {
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    events: UnboundedSender<ChannelEvent>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    closed: bool,
}

impl ChannelManager {
    /// Starts connecting right away and returns the event stream.
    pub fn open(
        transport: Arc<dyn Transport>,
        policy: ReconnectPolicy,
    ) -> (Self, UnboundedReceiver<ChannelEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let mut manager = Self {
            transport,
            policy,
            events,
            handle: None,
            cancel_token: None,
            closed: false,
        };
        manager.spawn_loop();
        (manager, receiver)
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True while the loop is still connecting, connected or retrying.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Restarts the channel after it gave up, with a fresh retry budget.
    /// A channel that is still active is left alone.
    pub fn reconnect(&mut self) -> bool {
        if self.closed || self.is_active() {
            return false;
        }
        info!("manual reconnect to {}", self.endpoint());
        self.spawn_loop();
        true
    }

    /// Stops event delivery and waits for the loop to exit. Safe to call twice.
    pub async fn close(&mut self) -> Result<()> {
        self.closed = true;
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("channel loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    fn spawn_loop(&mut self) {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(channel_loop(
            Arc::clone(&self.transport),
            self.policy,
            self.events.clone(),
            cancel_token.clone(),
        ));
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
