//! Where frames come from.

use std::future::Future;

use crate::error::FeedError;

/// A reconnectable stream of upstream text frames.
///
/// `next_frame` yields `Ok(None)` when the upstream closed the stream
/// cleanly; the caller is expected to `connect` again before reading more.
pub trait FrameSource: Send {
    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> &str;

    fn connect(&mut self) -> impl Future<Output = Result<(), FeedError>> + Send;

    fn next_frame(&mut self) -> impl Future<Output = Result<Option<String>, FeedError>> + Send;
}
