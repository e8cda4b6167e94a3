//! The ingestor task: upstream frames into the tangle.
//!
//! Each frame is parsed outside the lock and applied under it, so a frame is
//! either fully applied or not at all. A frame that fails to parse is logged
//! and skipped; nothing a single frame contains can stop the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use tipsel_rpc::TipselMetrics;
use tipsel_tangle::{parse_frame, Applied, FrameSource, SharedTangle, TxOutcome};

pub struct Ingestor {
    tangle: SharedTangle,
    metrics: Option<Arc<TipselMetrics>>,
}

impl Ingestor {
    pub fn new(tangle: SharedTangle, metrics: Option<Arc<TipselMetrics>>) -> Self {
        Self { tangle, metrics }
    }

    /// Parse and apply one frame. Returns what the tangle did with it, or
    /// `None` for frames that were skipped.
    pub async fn handle_frame(&self, frame: &str) -> Option<Applied> {
        if let Some(m) = &self.metrics {
            m.frames_received.inc();
        }

        let event = match parse_frame(frame) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!("ignoring frame of unused topic");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "skipping malformed frame");
                if let Some(m) = &self.metrics {
                    m.frames_malformed.inc();
                }
                return None;
            }
        };

        let mut tangle = self.tangle.lock().await;
        let applied = tangle.apply(event);

        if let Some(m) = &self.metrics {
            match applied {
                Applied::Transaction(TxOutcome::Inserted { .. }) => m.transactions_ingested.inc(),
                Applied::Transaction(TxOutcome::Duplicate) => {}
                Applied::Milestone(_) => m.milestones_observed.inc(),
            }
            m.tx_count.set(tangle.len() as i64);
            m.latest_milestone.set(tangle.latest_milestone().unwrap_or(-1));
            m.available_depth.set(tangle.available_depth());
        }
        Some(applied)
    }

    /// Consume `source` until shutdown, reconnecting after `reconnect_delay`
    /// whenever the feed ends or fails. Tangle state survives reconnects.
    pub async fn run<S: FrameSource>(
        &self,
        mut source: S,
        reconnect_delay: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut connected = false;
        loop {
            if !connected {
                let attempt = tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    attempt = source.connect() => attempt,
                };
                match attempt {
                    Ok(()) => connected = true,
                    Err(e) => {
                        warn!(error = %e, endpoint = source.endpoint(), "upstream connection failed");
                        if pause(reconnect_delay, &mut shutdown).await {
                            break;
                        }
                        continue;
                    }
                }
            }

            let next = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                next = source.next_frame() => next,
            };
            match next {
                Ok(Some(frame)) => {
                    self.handle_frame(&frame).await;
                }
                Ok(None) => {
                    info!(endpoint = source.endpoint(), "upstream feed closed, reconnecting");
                    connected = false;
                    if pause(reconnect_delay, &mut shutdown).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, endpoint = source.endpoint(), "upstream feed failed, reconnecting");
                    connected = false;
                    if pause(reconnect_delay, &mut shutdown).await {
                        break;
                    }
                }
            }
        }
        debug!("ingestor stopped");
    }
}

/// Sleep for `delay`; `true` if shutdown arrived first.
async fn pause(delay: Duration, shutdown: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.recv() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
