//! Workflow state notifications.
//!
//! Workflows report every state they enter through a [`WorkflowObserver`].
//! The checkout service forwards them into its `watch` channel; tests
//! record them.

use std::sync::Mutex;

use crate::card::CardState;
use crate::pix::PixState;

/// Receives workflow state changes.
pub trait WorkflowObserver: Send + Sync {
    fn on_pix(&self, state: &PixState);

    fn on_card(&self, state: &CardState);
}

/// Observer that ignores everything.
pub struct NoOpObserver;

impl WorkflowObserver for NoOpObserver {
    fn on_pix(&self, _state: &PixState) {}
    fn on_card(&self, _state: &CardState) {}
}

/// Observer that keeps every state it sees, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pix: Mutex<Vec<PixState>>,
    card: Mutex<Vec<CardState>>,
}

impl RecordingObserver {
    pub fn pix_states(&self) -> Vec<PixState> {
        self.pix.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn card_states(&self) -> Vec<CardState> {
        self.card.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl WorkflowObserver for RecordingObserver {
    fn on_pix(&self, state: &PixState) {
        if let Ok(mut states) = self.pix.lock() {
            states.push(state.clone());
        }
    }

    fn on_card(&self, state: &CardState) {
        if let Ok(mut states) = self.card.lock() {
            states.push(state.clone());
        }
    }
}
