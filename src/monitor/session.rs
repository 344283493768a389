use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use super::counters::{CounterSource, SystemCounters};
use super::sampler::{SamplerOutcome, StatsMessage, StatsSampler};

/// Messages buffered between the sampler and the socket writer. Small on
/// purpose: a slow client backpressures the sampler instead of piling up
/// stale throughput figures.
const MESSAGE_BUFFER: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

/// Registry entry for one live streaming connection.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub connected_at: Instant,
}

/// Server-side state for one streaming connection.
///
/// Owns its sampler task exclusively. Shutdown cancels the task and
/// waits for it to finish, so a discarded session never leaves
/// background work behind.
pub struct StreamSession {
    session_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<SamplerOutcome>>,
    rx: mpsc::Receiver<StatsMessage>,
}

impl StreamSession {
    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        if self.task.is_some() {
            SessionState::Active
        } else {
            SessionState::Closed
        }
    }

    /// Next message from the sampler; `None` once the task has finished
    /// and the channel is drained.
    pub async fn next_message(&mut self) -> Option<StatsMessage> {
        self.rx.recv().await
    }

    /// Cancel the sampler and wait for it to finish. Safe to call when
    /// the task already ended; later calls are no-ops.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        // Unblock a sampler parked on a full channel (client stopped
        // reading), otherwise the join below could wait forever.
        self.rx.close();
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(outcome) => {
                    debug!(session_id = %self.session_id, ?outcome, "sampler task finished")
                }
                Err(e) => debug!(session_id = %self.session_id, "sampler task aborted: {e}"),
            }
        }
    }
}

/// Tracks live streaming sessions and ties one sampler task to each.
pub struct SessionManager {
    interval: Duration,
    sessions: DashMap<String, SessionInfo>,
}

impl SessionManager {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            sessions: DashMap::new(),
        }
    }

    /// Accept a new streaming connection: spawn its sampler over the OS
    /// counter source and register the session.
    pub fn connect(&self) -> StreamSession {
        self.connect_with_source(SystemCounters::new())
    }

    /// Same as [`connect`](Self::connect) with the counter source
    /// injected, so tests can drive scripted counters through the
    /// production lifecycle.
    pub fn connect_with_source<C>(&self, source: C) -> StreamSession
    where
        C: CounterSource + 'static,
    {
        let session_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);

        let sampler = StatsSampler::new(source, self.interval);
        let span = info_span!("stats_sampler", session_id = %session_id);
        let task = tokio::spawn(sampler.run(tx, cancel.clone()).instrument(span));

        self.sessions.insert(
            session_id.clone(),
            SessionInfo {
                session_id: session_id.clone(),
                connected_at: Instant::now(),
            },
        );
        debug!(session_id = %session_id, "streaming session opened");

        StreamSession {
            session_id,
            cancel,
            task: Some(task),
            rx,
        }
    }

    /// End a session: deregister it, cancel its sampler and wait for the
    /// task to finish. Idempotent; disconnect is terminal for a session.
    pub async fn disconnect(&self, session: &mut StreamSession) {
        self.sessions.remove(&session.session_id);
        session.shutdown().await;
        debug!(session_id = %session.session_id, "streaming session closed");
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::counters::DeltaReport;
    use crate::monitor::testing::{Flat, Scripted, snap};

    fn manager(interval: Duration) -> SessionManager {
        SessionManager::new(interval)
    }

    #[tokio::test]
    async fn disconnect_cancels_the_sampler_and_deregisters() {
        let manager = manager(Duration::from_secs(60));
        let mut session = manager.connect_with_source(Flat);
        assert_eq!(manager.session_count(), 1);
        assert_eq!(session.state(), SessionState::Active);

        manager.disconnect(&mut session).await;
        assert_eq!(manager.session_count(), 0);
        assert_eq!(session.state(), SessionState::Closed);
        // Cancelled before the first tick: no message was ever produced.
        assert_eq!(session.next_message().await, None);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let manager = manager(Duration::from_secs(60));
        let mut session = manager.connect_with_source(Flat);

        manager.disconnect(&mut session).await;
        manager.disconnect(&mut session).await;
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn sessions_sample_independently() {
        let manager = manager(Duration::from_millis(10));
        let mut a = manager.connect_with_source(Scripted::new([
            Ok(snap(0, 0)),
            Ok(snap(10, 20)),
        ]));
        let mut b = manager.connect_with_source(Scripted::new([
            Ok(snap(1_000, 1_000)),
            Ok(snap(1_001, 1_002)),
        ]));
        assert_eq!(manager.session_count(), 2);

        assert_eq!(
            a.next_message().await,
            Some(StatsMessage::Delta(DeltaReport {
                bytes_sent: 10,
                bytes_recv: 20,
            }))
        );
        assert_eq!(
            b.next_message().await,
            Some(StatsMessage::Delta(DeltaReport {
                bytes_sent: 1,
                bytes_recv: 2,
            }))
        );

        manager.disconnect(&mut a).await;
        manager.disconnect(&mut b).await;
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let manager = manager(Duration::from_secs(60));
        let mut a = manager.connect_with_source(Flat);
        let mut b = manager.connect_with_source(Flat);
        assert_ne!(a.id(), b.id());
        assert_eq!(manager.list_sessions().len(), 2);

        manager.disconnect(&mut a).await;
        manager.disconnect(&mut b).await;
    }
}
