//! Fan-out of server messages to connected sessions

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ws::protocol::{PlayerId, ServerMsg};

/// Per-session outbound queue depth. A session that falls this far behind
/// starts losing messages.
pub const OUTBOUND_CAPACITY: usize = 64;

/// Outbound half of a session's queue
pub type Outbound = mpsc::Sender<ServerMsg>;

/// Routes messages to sessions. Cloneable, store in AppState.
#[derive(Clone, Default)]
pub struct Dispatcher {
    sessions: Arc<DashMap<PlayerId, Outbound>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: PlayerId, outbound: Outbound) {
        self.sessions.insert(id, outbound);
    }

    pub fn unregister(&self, id: &PlayerId) {
        self.sessions.remove(id);
    }

    pub fn is_registered(&self, id: &PlayerId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Send to a single session
    pub fn send_to(&self, id: &PlayerId, msg: ServerMsg) {
        if let Some(outbound) = self.sessions.get(id) {
            deliver(id, outbound.value(), msg);
        }
    }

    /// Send to every session
    pub fn send_to_all(&self, msg: &ServerMsg) {
        for entry in self.sessions.iter() {
            deliver(entry.key(), entry.value(), msg.clone());
        }
    }

    /// Send to every session but `except`
    pub fn send_to_all_except(&self, except: &PlayerId, msg: &ServerMsg) {
        for entry in self.sessions.iter().filter(|e| e.key() != except) {
            deliver(entry.key(), entry.value(), msg.clone());
        }
    }
}

/// Best effort: a full or closed queue drops the message for that session only
fn deliver(id: &PlayerId, outbound: &Outbound, msg: ServerMsg) {
    match outbound.try_send(msg) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(msg)) => {
            warn!(player_id = %id, event = msg.event(), "Outbound queue full, dropping message");
        }
        Err(mpsc::error::TrySendError::Closed(msg)) => {
            debug!(player_id = %id, event = msg.event(), "Session gone, dropping message");
        }
    }
}
