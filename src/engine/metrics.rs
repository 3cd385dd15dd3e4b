use serde::Serialize;

/// Counters accumulated between flushes. Each is monotonically increasing
/// until [`MetricsCounters::take`] zeroes the lot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsCounters {
    pub blocked_listeners: u64,
    pub blocked_handlers: u64,
    pub synthetic_bursts: u64,
}

impl MetricsCounters {
    pub fn any(&self) -> bool {
        self.blocked_listeners != 0 || self.blocked_handlers != 0 || self.synthetic_bursts != 0
    }

    /// Copy the current values out and reset to zero.
    pub fn take(&mut self) -> MetricsCounters {
        std::mem::take(self)
    }
}

/// The externally-addressed flush summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub blocked_subscriptions: u64,
    pub synthetic_bursts: u64,
    pub blocked_handler_assignments: u64,
}

impl From<MetricsCounters> for MetricsSummary {
    fn from(counters: MetricsCounters) -> Self {
        Self {
            blocked_subscriptions: counters.blocked_listeners,
            synthetic_bursts: counters.synthetic_bursts,
            blocked_handler_assignments: counters.blocked_handlers,
        }
    }
}
