//! Shutdown coordination for the frontend.

use std::sync::Arc;

use tokio::sync::watch;

use crate::net::acceptor::wait_closed;

/// One-shot shutdown flag shared by the accept loop and the signal handler.
///
/// Unlike a broadcast, the flag is sticky: a signal subscribed after the trigger
/// still fires.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown. Idempotent.
    pub fn trigger(&self) {
        if self.tx.send_if_modified(|triggered| !std::mem::replace(triggered, true)) {
            tracing::info!(subscribers = self.tx.receiver_count(), "Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Number of live signals (tasks still waiting).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered, or once every `Shutdown` handle is gone.
    pub async fn recv(&mut self) {
        wait_closed(&mut self.rx).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscribers_see_the_trigger() {
        let shutdown = Shutdown::new();
        let mut early = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        let mut late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), async {
            early.recv().await;
            late.recv().await;
        })
        .await
        .expect("both signals should resolve");
    }

    #[tokio::test]
    async fn pending_until_triggered() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        assert!(tokio::time::timeout(Duration::from_millis(50), signal.recv()).await.is_err());
    }
}
