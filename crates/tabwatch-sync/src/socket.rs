//! WebSocket transport for the command channel.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tabwatch_protocols::SyncError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::channel::{CommandConnector, CommandSocket};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the peer's command endpoint over WebSocket.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    url: String,
}

impl TungsteniteConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CommandConnector for TungsteniteConnector {
    async fn connect(&self) -> Result<Box<dyn CommandSocket>, SyncError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| SyncError::Connection(format!("{}: {}", self.url, e)))?;
        debug!("WebSocket connected to {}", self.url);
        let (sink, source) = stream.split();
        Ok(Box::new(WsSocket { sink, source }))
    }
}

struct WsSocket {
    sink: SplitSink<WsStream, Message>,
    source: SplitStream<WsStream>,
}

#[async_trait]
impl CommandSocket for WsSocket {
    async fn recv(&mut self) -> Option<String> {
        while let Some(message) = self.source.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    trace!("Command frame: {}", text);
                    return Some(text.to_string());
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed by peer");
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("WebSocket error: {}", e);
                    return None;
                }
            }
        }
        None
    }

    async fn send(&mut self, text: String) -> Result<(), SyncError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_frames_over_websocket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text("refresh_all".into())).await.unwrap();
            let reply = ws.next().await.unwrap().unwrap();
            ws.close(None).await.unwrap();
            reply.into_text().unwrap().to_string()
        });

        let connector = TungsteniteConnector::new(format!("ws://{}", addr));
        let mut socket = connector.connect().await.unwrap();
        assert_eq!(socket.recv().await.as_deref(), Some("refresh_all"));
        socket.send("refresh_all_done".to_string()).await.unwrap();
        assert_eq!(socket.recv().await, None);
        assert_eq!(server.await.unwrap(), "refresh_all_done");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let connector = TungsteniteConnector::new("ws://127.0.0.1:9");
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, SyncError::Connection(_)));
        assert!(err.to_string().contains("127.0.0.1:9"));
    }
}
