// src/shutdown.rs
// =============================================================================
// A shared "done" signal.
//
// One Shutdown is created per run and cloned into whoever needs to notice
// that the run is over: the blocking walker thread polls is_triggered()
// between entries, async tasks (the DNS refresher) await wait(). Triggering
// is one-way; there is no reset.
// =============================================================================

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Flips the signal for every clone. Safe to call more than once.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `trigger` has been called on any clone.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // the sender lives in self, so wait_for can only fail if it is dropped,
        // which cannot happen while we hold &self
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
