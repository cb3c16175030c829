pub mod controller;
pub mod loop_worker;
pub mod state;
pub mod transport;

pub use controller::ChannelManager;
pub use state::{ChannelEvent, ConnectionStatus, ReconnectPolicy, ReconnectTracker};
pub use transport::{Connection, Transport, WebSocketTransport};
