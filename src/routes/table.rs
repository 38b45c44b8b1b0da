//! Engine table for the request bridge.
//!
//! Uses `thread_local!` + `RefCell` for mutable access in single-threaded
//! WASM. The worker keeps the module alive, so each engine lives across
//! `handle_request` calls for the whole browser session. Engines themselves
//! hold no globals; this table is the only one.

use std::cell::RefCell;
use std::thread::LocalKey;

use serde::Serialize;

use crate::error::EngineResult;
use crate::game::mafia::MafiaEngine;
use crate::game::odd_one_in::OddOneInEngine;
use crate::game::sync::{self, SnapshotChannel};
use crate::game::undercover::UndercoverEngine;
use crate::game::{GameKind, RoleGameEngine};
use crate::routes::util::reply;

thread_local! {
    static MAFIA: RefCell<MafiaEngine> = RefCell::new(MafiaEngine::new());
    static UNDERCOVER: RefCell<UndercoverEngine> = RefCell::new(UndercoverEngine::new());
    static ODD_ONE_IN: RefCell<OddOneInEngine> = RefCell::new(OddOneInEngine::new());
    static OUTBOX: RefCell<Outbox> = const { RefCell::new(Outbox { pending: Vec::new() }) };
}

/// Snapshots waiting for the page to relay them to other tabs. Receivers
/// apply whatever arrives last, so only the newest snapshot per game is kept.
struct Outbox {
    pending: Vec<(GameKind, String)>,
}

/// One game's place in the outbox.
struct Slot<'a> {
    game: GameKind,
    outbox: &'a mut Outbox,
}

impl SnapshotChannel for Slot<'_> {
    fn publish(&mut self, encoded: &str) {
        let game = self.game;
        self.outbox.pending.retain(|(g, _)| *g != game);
        self.outbox.pending.push((game, encoded.to_string()));
    }
}

fn read<E, T>(key: &'static LocalKey<RefCell<E>>, f: impl FnOnce(&E) -> EngineResult<T>) -> String
where
    T: Serialize,
{
    key.with(|cell| reply(f(&*cell.borrow())))
}

/// Run a mutating operation; on success the new state is queued for broadcast.
fn write<E, T>(key: &'static LocalKey<RefCell<E>>, f: impl FnOnce(&mut E) -> EngineResult<T>) -> String
where
    E: RoleGameEngine,
    T: Serialize,
{
    key.with(|cell| {
        let mut engine = cell.borrow_mut();
        let result = f(&mut *engine);
        if result.is_ok() {
            publish(&*engine);
        }
        reply(result)
    })
}

fn publish<E: RoleGameEngine>(engine: &E) {
    OUTBOX.with(|outbox| {
        let mut outbox = outbox.borrow_mut();
        let mut slot = Slot {
            game: E::KIND,
            outbox: &mut *outbox,
        };
        let channel: &mut dyn SnapshotChannel = &mut slot;
        if let Err(e) = sync::broadcast(engine, None, Some(channel)) {
            tracing::warn!(game = %E::KIND, error = %e, "snapshot not broadcast");
        }
    });
}

pub fn read_mafia<T: Serialize>(f: impl FnOnce(&MafiaEngine) -> EngineResult<T>) -> String {
    read(&MAFIA, f)
}

pub fn write_mafia<T: Serialize>(f: impl FnOnce(&mut MafiaEngine) -> EngineResult<T>) -> String {
    write(&MAFIA, f)
}

pub fn read_undercover<T: Serialize>(f: impl FnOnce(&UndercoverEngine) -> EngineResult<T>) -> String {
    read(&UNDERCOVER, f)
}

pub fn write_undercover<T: Serialize>(
    f: impl FnOnce(&mut UndercoverEngine) -> EngineResult<T>,
) -> String {
    write(&UNDERCOVER, f)
}

pub fn read_odd_one_in<T: Serialize>(f: impl FnOnce(&OddOneInEngine) -> EngineResult<T>) -> String {
    read(&ODD_ONE_IN, f)
}

pub fn write_odd_one_in<T: Serialize>(
    f: impl FnOnce(&mut OddOneInEngine) -> EngineResult<T>,
) -> String {
    write(&ODD_ONE_IN, f)
}

/// Encoded snapshot of one game's engine.
pub fn snapshot(game: GameKind) -> EngineResult<String> {
    match game {
        GameKind::Mafia => MAFIA.with(|e| e.borrow().snapshot()),
        GameKind::Undercover => UNDERCOVER.with(|e| e.borrow().snapshot()),
        GameKind::OddOneIn => ODD_ONE_IN.with(|e| e.borrow().snapshot()),
    }
}

/// Full-state replace from a stored or broadcast snapshot. Not re-published:
/// it came from outside.
pub fn restore(game: GameKind, encoded: &str) -> EngineResult<()> {
    match game {
        GameKind::Mafia => MAFIA.with(|e| e.borrow_mut().restore(encoded)),
        GameKind::Undercover => UNDERCOVER.with(|e| e.borrow_mut().restore(encoded)),
        GameKind::OddOneIn => ODD_ONE_IN.with(|e| e.borrow_mut().restore(encoded)),
    }
}

/// Take the queued snapshots, least recently written game first.
pub fn drain_outbox() -> Vec<String> {
    OUTBOX.with(|o| {
        std::mem::take(&mut o.borrow_mut().pending)
            .into_iter()
            .map(|(_, encoded)| encoded)
            .collect()
    })
}

/// Fresh engines and an empty outbox.
pub fn reset() {
    MAFIA.with(|e| *e.borrow_mut() = MafiaEngine::new());
    UNDERCOVER.with(|e| *e.borrow_mut() = UndercoverEngine::new());
    ODD_ONE_IN.with(|e| *e.borrow_mut() = OddOneInEngine::new());
    OUTBOX.with(|o| o.borrow_mut().pending.clear());
}
