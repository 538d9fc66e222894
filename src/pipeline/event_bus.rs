// src/pipeline/event_bus.rs
//
// Decoupled event system. The scene-sync core publishes events instead of
// reaching into the renderer's or hardware collaborators' state. Events
// are drained once per tick, after all mutations are complete.

use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// All of this tick's scene mutations are complete; readers may go.
    TickComplete,

    /// The started flag flipped; true means the device is now offroad.
    OffroadTransition { offroad: bool },

    /// The physical display was switched on or off.
    DisplayPowerChanged { awake: bool },

    /// The interactive countdown reached zero.
    InteractiveTimeout,
}

pub struct EventBus {
    events: VecDeque<UiEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: UiEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<UiEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
