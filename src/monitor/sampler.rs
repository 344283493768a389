use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::counters::{CounterSource, DeltaReport};

/// One outbound message on the streaming channel.
///
/// Serializes to either `{"bytes_sent": n, "bytes_recv": n}` or
/// `{"error": "..."}`, matching what the dashboard frontend consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatsMessage {
    Delta(DeltaReport),
    Error { error: String },
}

/// How a sampler task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerOutcome {
    /// The owning session asked it to stop, or the receiver went away.
    Cancelled,
    /// A counter read failed; one diagnostic was emitted, then the task stopped.
    Failed,
}

/// Periodic throughput sampler bound to one streaming session.
///
/// Reads cumulative counters on an interval and emits signed per-tick
/// deltas. A failed read is reported once and ends the task: a flaky
/// counter source surfaces one error instead of spamming the client on
/// every tick. There is no retry.
pub struct StatsSampler<C> {
    source: C,
    interval: Duration,
}

impl<C: CounterSource> StatsSampler<C> {
    pub fn new(source: C, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Drive the sampling loop until cancellation or a read failure.
    ///
    /// Messages are delivered strictly in tick order through `tx`.
    /// Cancellation is observed at the interval sleep, so the task
    /// terminates within one tick of the request.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<StatsMessage>,
        cancel: CancellationToken,
    ) -> SamplerOutcome {
        let mut previous = match self.source.sample() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("initial counter read failed: {e}");
                let _ = tx
                    .send(StatsMessage::Error {
                        error: e.to_string(),
                    })
                    .await;
                return SamplerOutcome::Failed;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("sampler cancelled");
                    return SamplerOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            let current = match self.source.sample() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("counter read failed, stopping sampler: {e}");
                    let _ = tx
                        .send(StatsMessage::Error {
                            error: e.to_string(),
                        })
                        .await;
                    return SamplerOutcome::Failed;
                }
            };

            let delta = current.delta_since(&previous);
            previous = current;

            if tx.send(StatsMessage::Delta(delta)).await.is_err() {
                // Receiver dropped: the connection is gone.
                debug!("stats channel closed, stopping sampler");
                return SamplerOutcome::Cancelled;
            }
        }
    }
}
