//! Acceptor set: several listeners merged into one connection sequence.
//!
//! # Responsibilities
//! - Bind every configured acceptor up front, all-or-nothing
//! - Run one accept task per listener
//! - Expose a single merged `Incoming` sequence
//! - One-shot, idempotent close that unblocks every waiter

use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::config::AcceptorConfig;
use crate::net::connection::Connection;
use crate::net::listener::{Listener, ListenerOptions};

/// Connections buffered between listener tasks and the consumer.
const INCOMING_QUEUE_DEPTH: usize = 128;

/// Error type for acceptor setup. All variants are fatal at startup.
#[derive(Debug, Error)]
pub enum AcceptorError {
    #[error("invalid acceptor address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("acceptor address {address} is configured more than once")]
    AddressConflict { address: String },

    #[error("failed to bind acceptor {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to load TLS material for acceptor {address}: {source}")]
    Tls {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Resolves once the watched flag is true or its sender is gone.
pub(crate) async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed || closed.changed().await.is_err() {
            return;
        }
    }
}

/// Listeners bound and ready to accept.
#[derive(Debug)]
pub struct AcceptorSet {
    listeners: Vec<Listener>,
    addresses: HashSet<SocketAddr>,
    options: ListenerOptions,
}

impl AcceptorSet {
    pub fn new(options: ListenerOptions) -> Self {
        Self {
            listeners: Vec::new(),
            addresses: HashSet::new(),
            options,
        }
    }

    /// Bind every config. On any failure the listeners bound so far are closed
    /// before the error is returned.
    pub async fn bind(configs: &[AcceptorConfig], options: ListenerOptions) -> Result<Self, AcceptorError> {
        let mut set = Self::new(options);
        for config in configs {
            if let Err(error) = set.attach(config).await {
                let released = set.listeners.len();
                drop(set);
                tracing::error!(
                    address = %config.address,
                    released,
                    error = %error,
                    "Acceptor setup failed; released previously bound listeners"
                );
                return Err(error);
            }
        }
        Ok(set)
    }

    /// Bind one more acceptor immediately.
    pub async fn attach(&mut self, config: &AcceptorConfig) -> Result<SocketAddr, AcceptorError> {
        if let Ok(addr) = config.address.parse::<SocketAddr>() {
            // Port 0 asks the OS for a fresh port, so it never collides.
            if addr.port() != 0 && self.addresses.contains(&addr) {
                return Err(AcceptorError::AddressConflict {
                    address: config.address.clone(),
                });
            }
        }

        let listener = Listener::bind(config, &self.options).await?;
        let local_addr = listener.local_addr();
        if let Ok(addr) = config.address.parse::<SocketAddr>() {
            self.addresses.insert(addr);
        }
        self.listeners.push(listener);
        Ok(local_addr)
    }

    /// Addresses actually bound, in attach order.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(Listener::local_addr).collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Start one accept task per listener. Must be called inside a tokio runtime.
    pub fn listen(self) -> (Incoming, AcceptorCloser) {
        let (tx, rx) = mpsc::channel(INCOMING_QUEUE_DEPTH);
        let (close_tx, close_rx) = watch::channel(false);
        let closer = AcceptorCloser {
            tx: Arc::new(close_tx),
        };

        for listener in self.listeners {
            tokio::spawn(listener.run(tx.clone(), close_rx.clone()));
        }

        let incoming = Incoming {
            rx,
            closed: close_rx,
            closer: closer.clone(),
        };
        (incoming, closer)
    }
}

/// Merged sequence of connections from every listener.
///
/// Order is preserved per listener; connections from different listeners interleave freely.
#[derive(Debug)]
pub struct Incoming {
    rx: mpsc::Receiver<Connection>,
    closed: watch::Receiver<bool>,
    closer: AcceptorCloser,
}

impl Incoming {
    /// Next accepted connection, or `None` once the set is closed.
    pub async fn next(&mut self) -> Option<Connection> {
        let is_closed = *self.closed.borrow();
        if is_closed {
            return None;
        }

        tokio::select! {
            biased;
            _ = wait_closed(&mut self.closed) => None,
            connection = self.rx.recv() => connection,
        }
    }

    pub fn closer(&self) -> AcceptorCloser {
        self.closer.clone()
    }
}

/// Handle that stops every listener of a set.
#[derive(Debug, Clone)]
pub struct AcceptorCloser {
    tx: Arc<watch::Sender<bool>>,
}

impl AcceptorCloser {
    /// Stop accepting. Idempotent; already-accepted connections are untouched.
    pub fn close(&self) {
        let changed = self.tx.send_if_modified(|closed| !std::mem::replace(closed, true));
        if changed {
            tracing::info!("Closing acceptors");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }
}
