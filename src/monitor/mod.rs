//! Live network throughput streaming.
//!
//! One [`StreamSession`] per connected WebSocket client, each owning a
//! single background [`StatsSampler`] task that reads cumulative OS byte
//! counters on an interval and pushes signed per-tick deltas. The
//! [`SessionManager`] ties task lifecycle to connection lifecycle:
//! spawned on connect, cancelled and joined on disconnect.

pub mod counters;
pub mod sampler;
pub mod session;

pub use counters::{CounterSnapshot, CounterSource, DeltaReport, SystemCounters};
pub use sampler::{SamplerOutcome, StatsMessage, StatsSampler};
pub use session::{SessionInfo, SessionManager, SessionState, StreamSession};
