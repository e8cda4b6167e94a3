//! Nullable upstream feed: frames pushed by the test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use tipsel_tangle::{FeedError, FrameSource};

const NULL_ENDPOINT: &str = "null://feed";

/// Test side of a [`NullFeed`].
#[derive(Clone)]
pub struct FeedHandle {
    tx: mpsc::UnboundedSender<Option<String>>,
    connects: Arc<AtomicUsize>,
    failing_connects: Arc<AtomicUsize>,
}

impl FeedHandle {
    /// Deliver one frame.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(frame.into()));
    }

    pub fn push_all<I, S>(&self, frames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for frame in frames {
            self.push(frame);
        }
    }

    /// Simulate the upstream closing the stream.
    pub fn disconnect(&self) {
        let _ = self.tx.send(None);
    }

    /// Make the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: usize) {
        self.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Successful connections so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

/// An in-memory [`FrameSource`].
pub struct NullFeed {
    rx: mpsc::UnboundedReceiver<Option<String>>,
    connected: bool,
    connects: Arc<AtomicUsize>,
    failing_connects: Arc<AtomicUsize>,
}

impl NullFeed {
    pub fn new() -> (Self, FeedHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connects = Arc::new(AtomicUsize::new(0));
        let failing_connects = Arc::new(AtomicUsize::new(0));
        let feed = Self {
            rx,
            connected: false,
            connects: connects.clone(),
            failing_connects: failing_connects.clone(),
        };
        let handle = FeedHandle {
            tx,
            connects,
            failing_connects,
        };
        (feed, handle)
    }
}

impl FrameSource for NullFeed {
    fn endpoint(&self) -> &str {
        NULL_ENDPOINT
    }

    async fn connect(&mut self) -> Result<(), FeedError> {
        let pending = self.failing_connects.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_connects.store(pending - 1, Ordering::SeqCst);
            return Err(FeedError::Connect {
                url: NULL_ENDPOINT.to_string(),
                reason: "refused".into(),
            });
        }
        self.connected = true;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Waits for the next pushed frame. Once every [`FeedHandle`] is dropped
    /// the feed stays silent forever, like an idle upstream.
    async fn next_frame(&mut self) -> Result<Option<String>, FeedError> {
        if !self.connected {
            return Err(FeedError::NotConnected);
        }
        match self.rx.recv().await {
            Some(Some(frame)) => Ok(Some(frame)),
            Some(None) => {
                self.connected = false;
                Ok(None)
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_pushed_frames_in_order() {
        let (mut feed, handle) = NullFeed::new();
        feed.connect().await.unwrap();
        handle.push_all(["sn 1 A", "sn 2 B"]);
        assert_eq!(feed.next_frame().await.unwrap().as_deref(), Some("sn 1 A"));
        assert_eq!(feed.next_frame().await.unwrap().as_deref(), Some("sn 2 B"));
    }

    #[tokio::test]
    async fn disconnect_requires_reconnect() {
        let (mut feed, handle) = NullFeed::new();
        feed.connect().await.unwrap();
        handle.disconnect();
        assert_eq!(feed.next_frame().await.unwrap(), None);
        assert_eq!(feed.next_frame().await, Err(FeedError::NotConnected));
    }

    #[tokio::test]
    async fn scripted_connect_failures() {
        let (mut feed, handle) = NullFeed::new();
        handle.fail_next_connects(2);
        assert!(feed.connect().await.is_err());
        assert!(feed.connect().await.is_err());
        assert!(feed.connect().await.is_ok());
        assert_eq!(handle.connects(), 1);
    }
}
