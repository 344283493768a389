use serde::Serialize;
use sysinfo::Networks;

use crate::error::{NetdashError, Result};

/// Cumulative OS network byte counters at one sampling tick.
///
/// Totals are summed over all interfaces as reported since boot. A
/// snapshot is immutable once taken and superseded by the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl CounterSnapshot {
    /// Component-wise difference against an earlier snapshot.
    ///
    /// Unclamped: when a counter went backwards (interface restart) the
    /// negative delta is reported as-is.
    pub fn delta_since(&self, previous: &CounterSnapshot) -> DeltaReport {
        DeltaReport {
            bytes_sent: self.bytes_sent as i64 - previous.bytes_sent as i64,
            bytes_recv: self.bytes_recv as i64 - previous.bytes_recv as i64,
        }
    }
}

/// Per-tick throughput figures pushed to a streaming client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeltaReport {
    pub bytes_sent: i64,
    pub bytes_recv: i64,
}

/// Where a sampler reads counters from.
///
/// The production implementation wraps the OS interface statistics;
/// tests inject scripted sequences through the same seam.
pub trait CounterSource: Send {
    fn sample(&mut self) -> Result<CounterSnapshot>;
}

/// Counter source backed by the OS interface statistics.
pub struct SystemCounters {
    networks: Networks,
}

impl SystemCounters {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SystemCounters {
    fn sample(&mut self) -> Result<CounterSnapshot> {
        self.networks.refresh(true);

        let mut interfaces = 0usize;
        let mut snapshot = CounterSnapshot {
            bytes_sent: 0,
            bytes_recv: 0,
        };
        for (_name, data) in &self.networks {
            interfaces += 1;
            snapshot.bytes_sent += data.total_transmitted();
            snapshot.bytes_recv += data.total_received();
        }

        if interfaces == 0 {
            return Err(NetdashError::Counters(
                "no network interfaces visible".to_string(),
            ));
        }
        Ok(snapshot)
    }
}
