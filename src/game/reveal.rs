//! Pass-the-device reveal walk.
//!
//! The walk only ever yields the seat index of the current viewer; engines
//! turn that into a single reveal card. There is no way to ask the walk about
//! anyone else's seat except the next viewer's name prompt.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealWalk {
    order: Vec<usize>,
    cursor: usize,
}

impl RevealWalk {
    pub fn new(order: Vec<usize>) -> Self {
        Self { order, cursor: 0 }
    }

    /// Seat index of the participant holding the device, if the walk is running.
    pub fn current(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    /// Seat index of whoever gets the device next (`None` = hand it to the moderator).
    pub fn next_viewer(&self) -> Option<usize> {
        self.order.get(self.cursor + 1).copied()
    }

    /// Move on to the next viewer. Returns true when the walk has just finished.
    pub fn advance(&mut self) -> EngineResult<bool> {
        if self.is_complete() {
            return Err(EngineError::illegal("Every participant has already seen their role"));
        }
        self.cursor += 1;
        Ok(self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.order.len()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_visits_order_then_completes() {
        let mut walk = RevealWalk::new(vec![2, 0, 1]);
        assert_eq!(walk.current(), Some(2));
        assert_eq!(walk.next_viewer(), Some(0));
        assert!(!walk.advance().unwrap());
        assert_eq!(walk.current(), Some(0));
        assert!(!walk.advance().unwrap());
        assert_eq!(walk.current(), Some(1));
        assert_eq!(walk.next_viewer(), None);
        assert!(walk.advance().unwrap());
        assert_eq!(walk.current(), None);
        assert!(walk.is_complete());
    }

    #[test]
    fn advancing_past_the_end_is_illegal() {
        let mut walk = RevealWalk::new(vec![0]);
        walk.advance().unwrap();
        assert!(walk.advance().unwrap_err().is_illegal_transition());
        assert_eq!(walk.position(), 1);
    }
}
