//! ==============================================================================
//! session.rs - observer sessions and change notification
//! ==============================================================================
//!
//! purpose:
//!     tracks every connected WebSocket observer and delivers accepted
//!     changes to "all but the sender". registry membership is the sole
//!     source of truth for who is currently observing.
//!
//! delivery model:
//!     each session owns an unbounded mpsc queue drained by its own
//!     connection task. broadcast_except never awaits and never fails:
//!     a session whose receiver is gone is simply skipped, so a slow or
//!     disconnected observer cannot stall the others or the request
//!     that triggered the broadcast.
//!
//! relationships:
//!     - used by: ws.rs (register on connect, unregister on disconnect)
//!     - uses: domain.rs (event payloads)
//!
//! ==============================================================================

use crate::domain::{ButtonState, StateDocument};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// opaque session identity, unique for the life of the process
pub type SessionId = u64;

/// server -> client events, serialized as {"event": ..., "data": ...}
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// full document, sent once to a freshly connected session
    InitialState(StateDocument),
    /// one scalar field changed
    DataUpdated { key: String, value: String },
    /// the composite button field was replaced
    ButtonStateUpdated(ButtonState),
    /// ephemeral key-input echo; never touches the document
    KeyReceived { key_name: String },
}

/// client -> server events, same {"event", "data"} envelope
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    UpdateData { key: String, value: Value },
    KeyInput { key_name: String },
}

// ==============================================================================
// session registry
// ==============================================================================

#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: SessionId,
    sessions: HashMap<SessionId, mpsc::UnboundedSender<ServerEvent>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a session on connect; the caller immediately sends it a full
    /// snapshot before anything else.
    pub fn register(&self, tx: mpsc::UnboundedSender<ServerEvent>) -> SessionId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.sessions.insert(id, tx);
        id
    }

    /// remove a session on disconnect
    pub fn unregister(&self, id: SessionId) {
        self.inner.lock().unwrap().sessions.remove(&id);
    }

    /// deliver `event` to every registered session other than `sender`.
    /// sends are non-blocking; a dead receiver is skipped.
    pub fn broadcast_except(&self, sender: SessionId, event: ServerEvent) {
        let inner = self.inner.lock().unwrap();
        for (id, tx) in &inner.sessions {
            if *id == sender {
                continue;
            }
            let _ = tx.send(event.clone());
        }
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }
}
