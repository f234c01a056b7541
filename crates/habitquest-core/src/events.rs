//! # Events
//!
//! Typed change notifications emitted by the facade after a successful commit.
//! Each subscriber gets its own channel; subscribers that hang up are dropped on the
//! next emission.

use crate::{ArtifactId, GateId, HabitId, Profile};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// What happened to a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateChange {
    Spawned,
    Analyzed,
    Cleared,
    Removed,
}

/// A committed change to progression state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionEvent {
    /// Profile fields changed; carries the committed profile.
    ProfileChanged(Profile),
    GateChanged { gate: GateId, change: GateChange },
    ArtifactAwarded { artifact: ArtifactId, name: String },
    HabitCompleted { habit: HabitId, streak: u32, xp: u64 },
    LevelUp { level: u32 },
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ProgressionEvent>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&mut self) -> Receiver<ProgressionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every subscriber.
    pub fn emit(&mut self, event: &ProgressionEvent) {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            tracing::debug!(dropped, "removed disconnected event subscribers");
        }
    }

    /// Deliver a batch in order.
    pub fn emit_all(&mut self, events: &[ProgressionEvent]) {
        for event in events {
            self.emit(event);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_events() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(&ProgressionEvent::LevelUp { level: 2 });

        assert_eq!(a.try_recv(), Ok(ProgressionEvent::LevelUp { level: 2 }));
        assert_eq!(b.try_recv(), Ok(ProgressionEvent::LevelUp { level: 2 }));
    }

    #[test]
    fn disconnected_subscribers_are_dropped() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(&ProgressionEvent::LevelUp { level: 3 });

        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }
}
