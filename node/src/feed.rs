//! WebSocket transport for the upstream event feed.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use tipsel_tangle::{FeedError, FrameSource};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reads text frames from a WebSocket endpoint publishing the node's
/// event topics.
pub struct WebSocketFeed {
    url: String,
    stream: Option<WsStream>,
}

impl WebSocketFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl FrameSource for WebSocketFeed {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> Result<(), FeedError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        info!(url = %self.url, "connected to upstream feed");
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<String>, FeedError> {
        let stream = self.stream.as_mut().ok_or(FeedError::NotConnected)?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()))
                }
                // Pongs are queued by tungstenite and flushed on the next read.
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "upstream closed the feed");
                    self.stream = None;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(FeedError::Transport(e.to_string()));
                }
                None => {
                    self.stream = None;
                    return Ok(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;

    /// Accepts one WebSocket client, sends `frames` and closes.
    async fn spawn_upstream(frames: Vec<Message>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            ws.close(None).await.unwrap();
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn reads_text_and_binary_frames_until_close() {
        let url = spawn_upstream(vec![
            Message::Text("sn 1 A".into()),
            Message::Ping(vec![1]),
            Message::Binary(b"sn 2 B".to_vec()),
        ])
        .await;

        let mut feed = WebSocketFeed::new(url);
        feed.connect().await.unwrap();
        assert_eq!(feed.next_frame().await.unwrap().as_deref(), Some("sn 1 A"));
        assert_eq!(feed.next_frame().await.unwrap().as_deref(), Some("sn 2 B"));
        assert_eq!(feed.next_frame().await.unwrap(), None);
        assert!(!feed.is_connected());
    }

    #[tokio::test]
    async fn reading_before_connect_fails() {
        let mut feed = WebSocketFeed::new("ws://127.0.0.1:1");
        assert_eq!(feed.next_frame().await, Err(FeedError::NotConnected));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_connect_error() {
        let mut feed = WebSocketFeed::new("ws://127.0.0.1:1");
        assert!(matches!(
            feed.connect().await,
            Err(FeedError::Connect { .. })
        ));
    }
}
