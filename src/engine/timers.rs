use std::collections::HashMap;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    FakeActivity,
    MetricsFlush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub timer_id: u32,
    pub kind: TimerKind,
}

struct TimerEntry {
    kind: TimerKind,
    repeating: bool,
    task: JoinHandle<()>,
}

/// Owns the engine's timers. Expirations are queued on a channel and only
/// acted on when [`TimerService::drain_fired`] runs from the engine's pump,
/// so timer callbacks never race engine calls.
pub struct TimerService {
    handle: Handle,
    next_id: u32,
    timers: HashMap<u32, TimerEntry>,
    fired_tx: UnboundedSender<u32>,
    fired_rx: UnboundedReceiver<u32>,
}

impl TimerService {
    pub fn new() -> Self {
        let (fired_tx, fired_rx) = unbounded_channel();
        Self {
            handle: Handle::current(),
            next_id: 0,
            timers: HashMap::new(),
            fired_tx,
            fired_rx,
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.next_id
    }

    pub fn set_timeout(&mut self, delay: Duration, kind: TimerKind) -> u32 {
        let id = self.next_id();
        let tx = self.fired_tx.clone();
        let task = self.handle.spawn(async move {
            sleep(delay).await;
            let _ = tx.send(id);
        });
        self.timers.insert(
            id,
            TimerEntry {
                kind,
                repeating: false,
                task,
            },
        );
        id
    }

    pub fn set_interval(&mut self, period: Duration, kind: TimerKind) -> u32 {
        let id = self.next_id();
        let tx = self.fired_tx.clone();
        let task = self.handle.spawn(async move {
            loop {
                sleep(period).await;
                if tx.send(id).is_err() {
                    break;
                }
            }
        });
        self.timers.insert(
            id,
            TimerEntry {
                kind,
                repeating: true,
                task,
            },
        );
        id
    }

    pub fn clear(&mut self, id: u32) {
        if let Some(entry) = self.timers.remove(&id) {
            entry.task.abort();
        }
    }

    /// Collect expirations queued since the last drain. Timers cleared after
    /// queuing an expiration are skipped; one-shot timers are retired here.
    pub fn drain_fired(&mut self) -> Vec<TimerFired> {
        let mut fired = Vec::new();
        while let Ok(id) = self.fired_rx.try_recv() {
            let Some(entry) = self.timers.get(&id) else {
                continue;
            };
            let event = TimerFired {
                timer_id: id,
                kind: entry.kind,
            };
            if !entry.repeating {
                self.timers.remove(&id);
            }
            fired.push(event);
        }
        fired
    }

    pub fn has_active(&self) -> bool {
        !self.timers.is_empty()
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        for (_, entry) in self.timers.drain() {
            entry.task.abort();
        }
    }
}
