//! Broadcast hub
//!
//! Registry of live push connections. Every stored event is serialized once
//! and offered to each connection with a non-blocking `try_send`; a connection
//! whose buffer is full or whose receiver is gone is evicted on the spot.
//! There is no retry and no per-connection backlog beyond the bounded buffer,
//! so a slow viewer loses frames rather than stalling ingestion.

mod frames;

#[cfg(test)]
mod tests;

pub use frames::PushFrame;

use agentwatch_store::StoredEvent;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A registered push connection
///
/// The owner drains `receiver` into its socket. When the hub evicts or closes
/// the connection the sender is dropped and `receiver` yields `None`.
#[derive(Debug)]
pub struct PushConnection {
    /// Connection id, used to deregister
    pub id: Uuid,
    /// Outbound frames, already serialized
    pub receiver: mpsc::Receiver<Arc<str>>,
}

/// Connection manager for push viewers
pub struct ConnectionManager {
    connections: DashMap<Uuid, mpsc::Sender<Arc<str>>>,
    accepting: AtomicBool,
    send_buffer: usize,
}

impl ConnectionManager {
    /// Create a manager whose connections buffer up to `send_buffer` frames
    #[must_use]
    pub fn new(send_buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            accepting: AtomicBool::new(true),
            send_buffer: send_buffer.max(1),
        }
    }

    /// Register a connection, queuing the catch-up batch first
    ///
    /// The `initial` frame is enqueued before the connection becomes visible
    /// to broadcasts, so it always precedes any live event.
    pub fn add(&self, initial: &[StoredEvent]) -> Result<PushConnection> {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        let frame = PushFrame::Initial { data: initial }.encode()?;
        let (tx, rx) = mpsc::channel(self.send_buffer);
        // A fresh channel holds at least one frame and its receiver is alive
        if tx.try_send(frame).is_err() {
            return Err(Error::ShuttingDown);
        }

        let id = Uuid::new_v4();
        self.connections.insert(id, tx);

        // close_all may have run between the check and the insert
        if !self.is_accepting() {
            self.connections.remove(&id);
            return Err(Error::ShuttingDown);
        }

        info!(
            connection_id = %id,
            catch_up = initial.len(),
            connections = self.connections.len(),
            "Push connection registered"
        );
        Ok(PushConnection { id, receiver: rx })
    }

    /// Deregister a connection; returns whether it was still registered
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            debug!(connection_id = %id, "Push connection removed");
        }
        removed
    }

    /// Deliver a newly stored event to every connection
    ///
    /// Returns the number of connections that accepted the frame.
    pub fn broadcast_event(&self, event: &StoredEvent) -> usize {
        match (PushFrame::Event { data: event }).encode() {
            Ok(frame) => self.broadcast(frame),
            Err(e) => {
                warn!(event_id = event.id, error = %e, "Failed to encode push frame");
                0
            }
        }
    }

    /// Tell every connection the log was cleared
    pub fn broadcast_clear(&self) -> usize {
        match PushFrame::Clear.encode() {
            Ok(frame) => self.broadcast(frame),
            Err(e) => {
                warn!(error = %e, "Failed to encode clear frame");
                0
            }
        }
    }

    fn broadcast(&self, frame: Arc<str>) -> usize {
        let mut delivered = 0;
        let mut evicted = Vec::new();

        for entry in self.connections.iter() {
            match entry.value().try_send(Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(connection_id = %entry.key(), error = %e, "Push delivery failed");
                    evicted.push(*entry.key());
                }
            }
        }

        // Removing while iterating would deadlock on the shard lock
        for id in &evicted {
            self.connections.remove(id);
        }
        if !evicted.is_empty() {
            warn!(evicted = evicted.len(), "Evicted unresponsive push connections");
        }

        delivered
    }

    /// Stop accepting connections and drop every registered one
    pub fn close_all(&self) -> usize {
        self.accepting.store(false, Ordering::SeqCst);
        let count = self.connections.len();
        self.connections.clear();
        info!(closed = count, "Broadcast hub closed");
        count
    }

    /// Number of open connections
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether new connections are admitted
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(64)
    }
}
