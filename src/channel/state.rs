use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::metrics::Payload;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus::Connecting
    }
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }
}

/// Everything a session hears from its channel, delivered serially.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    Data(Payload),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Retries allowed after a failed attempt or a drop.
    pub attempts: u32,
    #[serde(with = "duration_ms")]
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Retry bookkeeping for one channel.
///
/// The first attempt is immediate. After any failure or drop the tracker hands
/// out at most `attempts` delays; a successful connection restores the budget.
#[derive(Debug, Clone)]
pub struct ReconnectTracker {
    policy: ReconnectPolicy,
    retries_used: u32,
    last_announced: Option<ConnectionStatus>,
}

impl ReconnectTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            retries_used: 0,
            last_announced: None,
        }
    }

    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    pub fn on_connected(&mut self) {
        self.retries_used = 0;
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries_used >= self.policy.attempts {
            return None;
        }
        self.retries_used += 1;
        Some(self.policy.delay)
    }

    /// Records a status the session has been told about.
    pub fn announce(&mut self, status: ConnectionStatus) {
        self.last_announced = Some(status);
    }

    /// Whether giving up still owes the session a `Disconnected`. True when the
    /// channel never connected, so the session would otherwise sit in `Connecting`.
    pub fn owes_disconnect(&self) -> bool {
        self.last_announced != Some(ConnectionStatus::Disconnected)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
