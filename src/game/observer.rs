//! "State changed" notifications from an engine to its rendering layer.
//!
//! Engines never render. After each transition they publish an
//! `EngineEvent`; the bridge (or a test) subscribes and redraws from the
//! engine's current state.

use std::fmt;

use serde::Serialize;

use crate::game::GameKind;
use crate::game::ids::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    PhaseChanged { game: GameKind, phase: &'static str },
    Tick { remaining: u32 },
    Eliminated { id: ParticipantId, name: String },
    GameOver { game: GameKind, winner: String },
}

type Listener = Box<dyn FnMut(&EngineEvent)>;

#[derive(Default)]
pub struct Observers {
    listeners: Vec<Listener>,
}

impl Observers {
    pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn notify(&mut self, event: &EngineEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_listener_sees_every_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::default();
        for _ in 0..2 {
            let seen = Rc::clone(&seen);
            observers.subscribe(move |e| seen.borrow_mut().push(e.clone()));
        }
        observers.notify(&EngineEvent::Tick { remaining: 3 });
        assert_eq!(observers.len(), 2);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[0], EngineEvent::Tick { remaining: 3 });
    }
}
