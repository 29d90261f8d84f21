//! Update Emitter
//!
//! The listener sink the engines push `StreamUpdate`s into. A disabled emitter
//! drops every update; emission never affects control flow.

use tokio::sync::mpsc;
use tracing::debug;

use incident_triage_core::update::{StreamUpdate, UpdatePayload};

/// Channel-backed sink for stream updates, optionally attributing every update
/// to a parent step or stage.
#[derive(Debug, Clone, Default)]
pub struct UpdateEmitter {
    tx: Option<mpsc::Sender<StreamUpdate>>,
    parent_id: Option<String>,
}

impl UpdateEmitter {
    /// Emit into `tx`.
    pub fn new(tx: mpsc::Sender<StreamUpdate>) -> Self {
        Self {
            tx: Some(tx),
            parent_id: None,
        }
    }

    /// An emitter with no listener.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Tag every emitted update with `parent_id`.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Send an update addressed to `step_id`.
    ///
    /// Updates for one step are delivered in call order. A closed listener is
    /// logged and otherwise ignored.
    pub async fn emit(&self, step_id: &str, payload: UpdatePayload) {
        let Some(tx) = &self.tx else {
            return;
        };
        let update = StreamUpdate::new(step_id, payload).with_parent(self.parent_id.clone());
        if tx.send(update).await.is_err() {
            debug!(step_id, "update listener closed; dropping update");
        }
    }
}
