//! Game engines: role assignment, phase progression and win checks for the
//! three party games. Everything here is pure state: no DOM, no storage, no
//! globals. The bridge in `routes` owns the engines and feeds them input.

pub mod assign;
pub mod content;
pub mod ids;
pub mod mafia;
pub mod observer;
pub mod odd_one_in;
pub mod reveal;
pub mod roster;
pub mod rules;
pub mod session;
pub mod sync;
pub mod timer;
pub mod undercover;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::game::observer::EngineEvent;

/// Which game an engine or snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    Mafia,
    OddOneIn,
    Undercover,
}

impl GameKind {
    pub fn slug(self) -> &'static str {
        match self {
            GameKind::Mafia => "mafia",
            GameKind::OddOneIn => "odd-one-in",
            GameKind::Undercover => "undercover",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "mafia" => Some(GameKind::Mafia),
            "odd-one-in" => Some(GameKind::OddOneIn),
            "undercover" => Some(GameKind::Undercover),
            _ => None,
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Operations every game engine offers to the bridge.
pub trait RoleGameEngine {
    const KIND: GameKind;

    /// Short tag for the current phase, used to pick the screen to render.
    fn phase_tag(&self) -> &'static str;

    /// Register a "state changed" listener.
    fn subscribe(&mut self, listener: Box<dyn FnMut(&EngineEvent)>);

    /// Cancel anything pending and build a brand-new session for the same roster.
    fn play_again(&mut self) -> EngineResult<()>;

    /// Encode the complete engine state for storage or broadcast.
    fn snapshot(&self) -> EngineResult<String>;

    /// Replace the complete engine state from an encoded snapshot.
    fn restore(&mut self, encoded: &str) -> EngineResult<()>;
}
