use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Opens connections to one fixed endpoint using one transport mode.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn endpoint(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

/// An established push channel yielding text frames.
#[async_trait]
pub trait Connection: Send {
    /// Next text frame, or `None` once the peer has gone away.
    async fn next_frame(&mut self) -> Option<Result<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// Websocket-only transport; there is no fallback mode.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .with_context(|| format!("websocket connect to {} failed", self.url))?;
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Control frames are answered by tungstenite itself.
                Ok(_) => continue,
                Err(err) => return Some(Err(err).context("websocket read failed")),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .context("websocket close failed")
    }
}
