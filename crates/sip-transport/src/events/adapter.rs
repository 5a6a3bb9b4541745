use tokio::sync::mpsc;
use tracing::warn;

use crate::transport::TransportEvent;

/// Fans a transport's raw event stream out to one or more subscribers
/// (the transaction layer, diagnostics, tests) without coupling this
/// crate to what's upstream of it.
pub struct TransportEventAdapter {
    subscribers: Vec<mpsc::Sender<TransportEvent>>,
}

impl TransportEventAdapter {
    pub fn new() -> Self {
        TransportEventAdapter { subscribers: Vec::new() }
    }

    pub fn subscribe(&mut self, capacity: usize) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(capacity);
        self.subscribers.push(tx);
        rx
    }

    /// Drives `source` to completion, cloning each event out to every
    /// subscriber. Intended to run as its own task per bound transport.
    pub async fn run(mut self, mut source: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = source.recv().await {
            self.subscribers.retain(|tx| !tx.is_closed());
            for tx in &self.subscribers {
                if tx.send(event.clone()).await.is_err() {
                    warn!("transport event subscriber dropped its receiver");
                }
            }
        }
    }
}

impl Default for TransportEventAdapter {
    fn default() -> Self {
        Self::new()
    }
}
