use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transaction::InternalTransactionCommand;

/// The timer handle storage every [`super::logic::TransactionLogic`]
/// impl uses: a named set of `JoinHandle`s for whichever timers
/// (`"A"`..`"K"`, `"100"`) that FSM currently has armed. One-shot
/// timers are re-armed by `handle_timer` itself when a timer is meant
/// to repeat (Timer A/E/G); this just tracks what's currently pending
/// so a state transition can cancel it all at once.
#[derive(Default)]
pub struct TimerSet {
    handles: HashMap<String, JoinHandle<()>>,
    /// The current retransmit interval for timers that double on each
    /// firing (A/E/G), keyed by timer name. `handle_timer` reads the
    /// previous interval here to compute the next one and writes the
    /// result back; timers that don't double never touch this map.
    intervals: HashMap<String, Duration>,
}

impl TimerSet {
    /// Arms a one-shot timer: after `duration`, sends
    /// `InternalTransactionCommand::Timer(name)` on `self_tx`. Replaces
    /// (cancelling) any previous timer with the same name.
    pub fn arm(&mut self, name: &str, duration: Duration, self_tx: mpsc::Sender<InternalTransactionCommand>) {
        self.cancel(name);
        let timer_name = name.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = self_tx.send(InternalTransactionCommand::Timer(timer_name)).await;
        });
        self.handles.insert(name.to_string(), handle);
    }

    pub fn cancel(&mut self, name: &str) {
        if let Some(handle) = self.handles.remove(name) {
            handle.abort();
        }
        self.intervals.remove(name);
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
        self.intervals.clear();
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// The retransmit interval last recorded for `name` via
    /// [`Self::set_interval`], if any.
    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.intervals.get(name).copied()
    }

    pub fn set_interval(&mut self, name: &str, duration: Duration) {
        self.intervals.insert(name.to_string(), duration);
    }
}
