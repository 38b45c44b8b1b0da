//! Mafia: moderated night/day elimination game.
//!
//! Phase flow:
//!
//! ```text
//! Setup → RoleViewing → Overview → Night → Morning → Day
//!                                    ↑                 │ confirm / skip
//!                                    │                 ├─→ BomberRetaliation ─┐
//!                                    └── next round ←──┴──────────────────────┘
//! any elimination or round start may end in → Winner
//! ```
//!
//! The engine records the outcomes the moderator enters (night victim, doctor
//! save, lover bond, day votes, bomber blast) and applies the rules; it does
//! not model who woke up when.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::ids::ParticipantId;
use crate::game::observer::{EngineEvent, Observers};
use crate::game::roster::{Role, RoleConfig, RosterEntry, Seat, validate_names};
use crate::game::rules::MafiaRules;
use crate::game::session::Session;
use crate::game::sync::Snapshot;
use crate::game::{GameKind, RoleGameEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MafiaRole {
    Doctor,
    Mafia,
    Detective,
    Jester,
    Bomber,
    Lover,
    Civilian,
}

impl Role for MafiaRole {
    const REMAINDER: Self = MafiaRole::Civilian;

    fn label(self) -> &'static str {
        match self {
            MafiaRole::Doctor => "Doctor",
            MafiaRole::Mafia => "Mafia",
            MafiaRole::Detective => "Detective",
            MafiaRole::Jester => "Jester",
            MafiaRole::Bomber => "Bomber",
            MafiaRole::Lover => "Lover",
            MafiaRole::Civilian => "Civilian",
        }
    }
}

impl MafiaRole {
    pub fn is_mafia(self) -> bool {
        self == MafiaRole::Mafia
    }

    pub fn description(self) -> &'static str {
        match self {
            MafiaRole::Doctor => "Can save one life every night.",
            MafiaRole::Mafia => "Eliminate civilians at night.",
            MafiaRole::Detective => "Suspect players to find Mafia.",
            MafiaRole::Jester => "Try to get voted out to win!",
            MafiaRole::Bomber => "Take someone with you if voted out.",
            MafiaRole::Lover => "Protects someone by sacrifice.",
            MafiaRole::Civilian => "Find the Mafia!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MafiaPhase {
    Setup,
    RoleViewing,
    Overview,
    Night,
    Morning,
    Day,
    BomberRetaliation,
    Winner,
}

impl MafiaPhase {
    pub fn tag(self) -> &'static str {
        match self {
            MafiaPhase::Setup => "setup",
            MafiaPhase::RoleViewing => "role_viewing",
            MafiaPhase::Overview => "overview",
            MafiaPhase::Night => "night",
            MafiaPhase::Morning => "morning",
            MafiaPhase::Day => "day",
            MafiaPhase::BomberRetaliation => "bomber_retaliation",
            MafiaPhase::Winner => "winner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "team", rename_all = "snake_case")]
pub enum MafiaWinner {
    Civilians,
    Mafia,
    /// Solo win: the jester got voted out.
    Jester { id: ParticipantId },
}

impl MafiaWinner {
    pub fn label(self) -> &'static str {
        match self {
            MafiaWinner::Civilians => "Civilians",
            MafiaWinner::Mafia => "Mafia",
            MafiaWinner::Jester { .. } => "Jester",
        }
    }
}

/// What the town wakes up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NightOutcome {
    /// No victim was chosen.
    Quiet,
    /// The doctor protected the victim.
    Saved { target: ParticipantId },
    Killed { victim: ParticipantId },
    /// The lover died in place of their bonded target.
    Sacrificed { lover: ParticipantId, target: ParticipantId },
}

impl NightOutcome {
    /// Whoever actually dies.
    pub fn decedent(self) -> Option<ParticipantId> {
        match self {
            NightOutcome::Quiet | NightOutcome::Saved { .. } => None,
            NightOutcome::Killed { victim } => Some(victim),
            NightOutcome::Sacrificed { lover, .. } => Some(lover),
        }
    }
}

/// One line of the moderator's night script, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightCall {
    CitySleeps,
    Mafia,
    Doctor,
    Detective,
    Lover,
}

/// The single card shown to the participant holding the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MafiaCard {
    pub name: String,
    pub role: MafiaRole,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MafiaReport {
    pub winner: MafiaWinner,
    pub roster: Vec<RosterEntry<MafiaRole>>,
}

/// Sacrifice substitution, decided before any elimination side effects.
pub fn resolve_night(
    session: &Session<MafiaRole>,
    victim: Option<ParticipantId>,
    protected: Option<ParticipantId>,
    bond: Option<ParticipantId>,
) -> NightOutcome {
    let Some(victim) = victim else {
        return NightOutcome::Quiet;
    };
    if protected == Some(victim) {
        return NightOutcome::Saved { target: victim };
    }
    if bond == Some(victim) {
        if let Some(lover) = session.first_with_role(MafiaRole::Lover) {
            if lover.is_alive() && lover.id() != victim {
                return NightOutcome::Sacrificed {
                    lover: lover.id(),
                    target: victim,
                };
            }
        }
    }
    NightOutcome::Killed { victim }
}

/// Tie goes to the mafia: equal numbers means they control the vote.
pub fn check_win(session: &Session<MafiaRole>) -> Option<MafiaWinner> {
    let mafia = session.count_alive(MafiaRole::is_mafia);
    let others = session.count_alive(|r| !r.is_mafia());
    if mafia == 0 {
        Some(MafiaWinner::Civilians)
    } else if mafia >= others {
        Some(MafiaWinner::Mafia)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MafiaGame {
    session: Session<MafiaRole>,
    phase: MafiaPhase,
    lover_bond: Option<ParticipantId>,
    victim: Option<ParticipantId>,
    protected: Option<ParticipantId>,
    last_night: Option<NightOutcome>,
    vote_queue: Vec<ParticipantId>,
    pending_bombers: VecDeque<ParticipantId>,
    winner: Option<MafiaWinner>,
}

impl MafiaGame {
    fn new(session: Session<MafiaRole>) -> Self {
        Self {
            session,
            phase: MafiaPhase::RoleViewing,
            lover_bond: None,
            victim: None,
            protected: None,
            last_night: None,
            vote_queue: Vec::new(),
            pending_bombers: VecDeque::new(),
            winner: None,
        }
    }

    pub fn session(&self) -> &Session<MafiaRole> {
        &self.session
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MafiaState {
    rules: MafiaRules,
    config: RoleConfig<MafiaRole>,
    game: Option<MafiaGame>,
}

impl MafiaState {
    /// Rules and config arriving in a snapshot get the same checks as a
    /// rules upload.
    fn check(&self) -> EngineResult<()> {
        self.rules
            .validate()
            .and_then(|()| self.config.check_against(self.rules.players, &self.rules.roles))
            .map_err(|e| EngineError::snapshot(format!("Snapshot carries bad rules: {e}")))
    }
}

#[derive(Debug)]
pub struct MafiaEngine {
    state: MafiaState,
    rng: StdRng,
    observers: Observers,
    revision: u64,
}

impl Default for MafiaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MafiaEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        let rules = MafiaRules::default();
        let config = RoleConfig::new(rules.players, rules.default_players, &rules.roles);
        Self {
            state: MafiaState {
                rules,
                config,
                game: None,
            },
            rng,
            observers: Observers::default(),
            revision: 0,
        }
    }

    // ── Setup ──────────────────────────────────────────────────────

    pub fn rules(&self) -> &MafiaRules {
        &self.state.rules
    }

    /// Swap in house rules; only while nobody is playing.
    pub fn set_rules(&mut self, rules: MafiaRules) -> EngineResult<()> {
        self.require_setup()?;
        rules.validate()?;
        self.state.config = RoleConfig::new(rules.players, rules.default_players, &rules.roles);
        self.state.rules = rules;
        self.touch();
        Ok(())
    }

    pub fn config(&self) -> &RoleConfig<MafiaRole> {
        &self.state.config
    }

    pub fn set_total_players(&mut self, n: i32) -> EngineResult<u8> {
        self.require_setup()?;
        let total = self.state.config.set_total_players(n);
        self.touch();
        Ok(total)
    }

    pub fn set_role_count(&mut self, role: MafiaRole, n: i32) -> EngineResult<u8> {
        self.require_setup()?;
        let count = self.state.config.set_role_count(role, n)?;
        self.touch();
        Ok(count)
    }

    pub fn start_game(&mut self, names: &[String]) -> EngineResult<()> {
        self.require_setup()?;
        self.launch(names)
    }

    fn launch(&mut self, names: &[String]) -> EngineResult<()> {
        let config = &self.state.config;
        let names = validate_names(names, usize::from(config.total_players()))?;
        let roles = config.role_multiset()?;
        let session = Session::start(names, roles, &mut self.rng, |_| None);
        tracing::info!(code = %session.code(), players = session.participants().len(), "mafia game started");
        self.state.game = Some(MafiaGame::new(session));
        self.enter(MafiaPhase::RoleViewing);
        Ok(())
    }

    /// Drop the current game and go back to the setup screen.
    pub fn end_game(&mut self) {
        self.state.game = None;
        self.enter(MafiaPhase::Setup);
    }

    // ── Reveal walk ────────────────────────────────────────────────

    pub fn current_reveal(&self) -> EngineResult<MafiaCard> {
        let game = self.in_phase(MafiaPhase::RoleViewing)?;
        let p = game
            .session
            .current_viewer()
            .ok_or_else(|| EngineError::illegal("Reveal walk is already complete"))?;
        Ok(MafiaCard {
            name: p.name().to_string(),
            role: p.role(),
            label: p.role().label(),
            description: p.role().description(),
        })
    }

    /// Name for the "pass the phone to ..." prompt; `None` means the moderator.
    pub fn next_viewer_name(&self) -> EngineResult<Option<String>> {
        let game = self.in_phase(MafiaPhase::RoleViewing)?;
        Ok(game.session.next_viewer_name().map(str::to_string))
    }

    pub fn current_viewer_name(&self) -> EngineResult<String> {
        let game = self.in_phase(MafiaPhase::RoleViewing)?;
        game.session
            .current_viewer()
            .map(|p| p.name().to_string())
            .ok_or_else(|| EngineError::illegal("Reveal walk is already complete"))
    }

    pub fn advance_viewer(&mut self) -> EngineResult<()> {
        let game = self.in_phase_mut(MafiaPhase::RoleViewing)?;
        if game.session.advance_viewer()? {
            self.enter(MafiaPhase::Overview);
        } else {
            self.touch();
        }
        Ok(())
    }

    /// Full role list for the moderator. Only after the walk or at game end.
    pub fn overview(&self) -> EngineResult<Vec<RosterEntry<MafiaRole>>> {
        let game = self.game()?;
        match game.phase {
            MafiaPhase::Overview | MafiaPhase::Winner => Ok(game.session.roster()),
            other => Err(EngineError::illegal(format!(
                "Roles are hidden during {}",
                other.tag()
            ))),
        }
    }

    // ── Night ──────────────────────────────────────────────────────

    pub fn begin_night(&mut self) -> EngineResult<()> {
        self.in_phase(MafiaPhase::Overview)?;
        self.enter(MafiaPhase::Night);
        Ok(())
    }

    pub fn night_script(&self) -> EngineResult<Vec<NightCall>> {
        let game = self.in_phase(MafiaPhase::Night)?;
        let alive = |role| game.session.count_alive(|r| r == role) > 0;
        let mut calls = vec![NightCall::CitySleeps, NightCall::Mafia, NightCall::Doctor];
        if alive(MafiaRole::Detective) {
            calls.push(NightCall::Detective);
        }
        if game.session.round() == 1 && alive(MafiaRole::Lover) {
            calls.push(NightCall::Lover);
        }
        Ok(calls)
    }

    /// Fix the lover's bond. First night only, and never changed afterwards.
    pub fn bond_lover(&mut self, target: ParticipantId) -> EngineResult<()> {
        let game = self.in_phase_mut(MafiaPhase::Night)?;
        if game.session.round() != 1 {
            return Err(EngineError::illegal("The lover bonds on the first night only"));
        }
        if game.lover_bond.is_some() {
            return Err(EngineError::illegal("The lover's bond is already set"));
        }
        let lover = game
            .session
            .first_with_role(MafiaRole::Lover)
            .filter(|l| l.is_alive())
            .ok_or_else(|| EngineError::illegal("There is no living lover"))?;
        if lover.id() == target {
            return Err(EngineError::validation("The lover cannot bond with themselves"));
        }
        game.session.living(target)?;
        game.lover_bond = Some(target);
        tracing::debug!(%target, "lover bond set");
        self.touch();
        Ok(())
    }

    pub fn lover_bond(&self) -> Option<ParticipantId> {
        self.state.game.as_ref().and_then(|g| g.lover_bond)
    }

    /// The mafia's pick; `None` clears it.
    pub fn record_victim(&mut self, victim: Option<ParticipantId>) -> EngineResult<()> {
        let game = self.in_phase_mut(MafiaPhase::Night)?;
        if let Some(id) = victim {
            game.session.living(id)?;
        }
        game.victim = victim;
        self.touch();
        Ok(())
    }

    /// The doctor's save; `None` clears it.
    pub fn record_protection(&mut self, protected: Option<ParticipantId>) -> EngineResult<()> {
        let game = self.in_phase_mut(MafiaPhase::Night)?;
        if let Some(id) = protected {
            if game.session.count_alive(|r| r == MafiaRole::Doctor) == 0 {
                return Err(EngineError::illegal("There is no living doctor"));
            }
            game.session.living(id)?;
        }
        game.protected = protected;
        self.touch();
        Ok(())
    }

    /// Resolve the night. Night deaths never trigger jester or bomber effects.
    pub fn end_night(&mut self) -> EngineResult<NightOutcome> {
        let game = self.in_phase_mut(MafiaPhase::Night)?;
        let outcome = resolve_night(&game.session, game.victim, game.protected, game.lover_bond);
        game.last_night = Some(outcome);
        if let Some(id) = outcome.decedent() {
            let seat = game.session.eliminate(id)?;
            self.announce(&seat);
        }
        tracing::info!(?outcome, "night resolved");
        if !self.settle()? {
            self.enter(MafiaPhase::Morning);
        }
        Ok(outcome)
    }

    pub fn last_night(&self) -> Option<NightOutcome> {
        self.state.game.as_ref().and_then(|g| g.last_night)
    }

    // ── Day ────────────────────────────────────────────────────────

    pub fn start_day(&mut self) -> EngineResult<()> {
        let game = self.in_phase_mut(MafiaPhase::Morning)?;
        game.vote_queue.clear();
        if !self.settle()? {
            self.enter(MafiaPhase::Day);
        }
        Ok(())
    }

    /// Add or remove a participant from the elimination queue.
    /// Returns whether they are now selected.
    pub fn toggle_vote(&mut self, id: ParticipantId) -> EngineResult<bool> {
        let limit = usize::from(self.state.rules.max_day_eliminations);
        let game = self.in_phase_mut(MafiaPhase::Day)?;
        game.session.living(id)?;
        let selected = if let Some(pos) = game.vote_queue.iter().position(|&q| q == id) {
            game.vote_queue.remove(pos);
            false
        } else if game.vote_queue.len() < limit {
            game.vote_queue.push(id);
            true
        } else {
            return Err(EngineError::validation(format!(
                "At most {limit} participants can be eliminated at once"
            )));
        };
        self.touch();
        Ok(selected)
    }

    pub fn vote_queue(&self) -> &[ParticipantId] {
        self.state
            .game
            .as_ref()
            .map(|g| g.vote_queue.as_slice())
            .unwrap_or_default()
    }

    /// Eliminate everyone queued at once. A voted-out jester wins outright;
    /// otherwise each voted-out bomber owes a blast, in vote order, and heads
    /// are only counted once every blast has landed.
    pub fn confirm_eliminations(&mut self) -> EngineResult<Vec<Seat>> {
        let game = self.in_phase_mut(MafiaPhase::Day)?;
        if game.vote_queue.is_empty() {
            return Err(EngineError::illegal("No participant selected for elimination"));
        }
        for &id in &game.vote_queue {
            game.session.living(id)?;
        }
        let queue = std::mem::take(&mut game.vote_queue);

        let mut removed = Vec::with_capacity(queue.len());
        let mut jester = None;
        for &id in &queue {
            let role = game.session.participant(id)?.role();
            removed.push(game.session.eliminate(id)?);
            match role {
                MafiaRole::Jester if jester.is_none() => jester = Some(id),
                MafiaRole::Bomber => game.pending_bombers.push_back(id),
                _ => {}
            }
        }
        for seat in &removed {
            self.announce(seat);
        }

        if let Some(id) = jester {
            self.finish(MafiaWinner::Jester { id });
        } else if !self.game()?.pending_bombers.is_empty() {
            self.enter(MafiaPhase::BomberRetaliation);
        } else if !self.settle()? {
            self.advance_round()?;
        }
        Ok(removed)
    }

    pub fn skip_elimination(&mut self) -> EngineResult<()> {
        self.in_phase(MafiaPhase::Day)?;
        self.advance_round()
    }

    /// The bomber who still owes a blast, if any.
    pub fn pending_bomber(&self) -> Option<ParticipantId> {
        self.state
            .game
            .as_ref()
            .filter(|g| g.phase == MafiaPhase::BomberRetaliation)
            .and_then(|g| g.pending_bombers.front().copied())
    }

    /// The voted-out bomber takes `target` with them. The blast itself never
    /// triggers another jester or bomber effect.
    pub fn bomber_detonate(&mut self, target: ParticipantId) -> EngineResult<Seat> {
        let game = self.in_phase_mut(MafiaPhase::BomberRetaliation)?;
        game.session.living(target)?;
        let bomber = game
            .pending_bombers
            .pop_front()
            .ok_or_else(|| EngineError::illegal("No bomber is waiting to detonate"))?;
        let seat = game.session.eliminate(target)?;
        let more = !game.pending_bombers.is_empty();
        tracing::info!(%bomber, %target, "bomber detonated");
        self.announce(&seat);

        if self.settle()? {
            return Ok(seat);
        }
        if more {
            self.touch();
        } else {
            self.advance_round()?;
        }
        Ok(seat)
    }

    // ── Round / end ────────────────────────────────────────────────

    fn advance_round(&mut self) -> EngineResult<()> {
        let game = self.game_mut()?;
        let round = game.session.next_round();
        game.victim = None;
        game.protected = None;
        game.last_night = None;
        game.vote_queue.clear();
        game.pending_bombers.clear();
        tracing::info!(round, "mafia round advanced");
        if !self.settle()? {
            self.enter(MafiaPhase::Night);
        }
        Ok(())
    }

    pub fn winner(&self) -> Option<MafiaReport> {
        let game = self.state.game.as_ref()?;
        game.winner.map(|winner| MafiaReport {
            winner,
            roster: game.session.roster(),
        })
    }

    pub fn phase(&self) -> MafiaPhase {
        self.state
            .game
            .as_ref()
            .map_or(MafiaPhase::Setup, |g| g.phase)
    }

    pub fn round(&self) -> Option<u32> {
        self.state.game.as_ref().map(|g| g.session.round())
    }

    /// Names and alive flags only; safe to show at any time.
    pub fn seats(&self) -> Vec<Seat> {
        self.state
            .game
            .as_ref()
            .map(|g| g.session.seats())
            .unwrap_or_default()
    }

    pub fn game_state(&self) -> Option<&MafiaGame> {
        self.state.game.as_ref()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn require_setup(&self) -> EngineResult<()> {
        if self.state.game.is_some() {
            return Err(EngineError::illegal("A game is already in progress"));
        }
        Ok(())
    }

    fn game(&self) -> EngineResult<&MafiaGame> {
        self.state
            .game
            .as_ref()
            .ok_or_else(|| EngineError::illegal("No game in progress"))
    }

    fn game_mut(&mut self) -> EngineResult<&mut MafiaGame> {
        self.state
            .game
            .as_mut()
            .ok_or_else(|| EngineError::illegal("No game in progress"))
    }

    fn in_phase(&self, phase: MafiaPhase) -> EngineResult<&MafiaGame> {
        let game = self.game()?;
        if game.phase != phase {
            return Err(EngineError::illegal(format!(
                "Expected {} phase, currently {}",
                phase.tag(),
                game.phase.tag()
            )));
        }
        Ok(game)
    }

    fn in_phase_mut(&mut self, phase: MafiaPhase) -> EngineResult<&mut MafiaGame> {
        self.in_phase(phase)?;
        self.game_mut()
    }

    /// Run the win check; on a result, end the game. Returns true if it ended.
    fn settle(&mut self) -> EngineResult<bool> {
        match check_win(&self.game()?.session) {
            Some(winner) => {
                self.finish(winner);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn finish(&mut self, winner: MafiaWinner) {
        if let Some(game) = self.state.game.as_mut() {
            game.winner = Some(winner);
            game.pending_bombers.clear();
            game.vote_queue.clear();
        }
        tracing::info!(winner = winner.label(), "mafia game over");
        self.enter(MafiaPhase::Winner);
        self.observers.notify(&EngineEvent::GameOver {
            game: GameKind::Mafia,
            winner: winner.label().to_string(),
        });
    }

    fn announce(&mut self, seat: &Seat) {
        tracing::info!(name = %seat.name, "participant eliminated");
        self.observers.notify(&EngineEvent::Eliminated {
            id: seat.id,
            name: seat.name.clone(),
        });
    }

    fn enter(&mut self, phase: MafiaPhase) {
        if let Some(game) = self.state.game.as_mut() {
            game.phase = phase;
        }
        self.touch();
        tracing::debug!(phase = phase.tag(), "mafia phase changed");
        self.observers.notify(&EngineEvent::PhaseChanged {
            game: GameKind::Mafia,
            phase: phase.tag(),
        });
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl RoleGameEngine for MafiaEngine {
    const KIND: GameKind = GameKind::Mafia;

    fn phase_tag(&self) -> &'static str {
        self.phase().tag()
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&EngineEvent)>) {
        self.observers.subscribe(listener);
    }

    fn play_again(&mut self) -> EngineResult<()> {
        let names = self.game()?.session.names();
        self.state.game = None;
        self.launch(&names)
    }

    fn snapshot(&self) -> EngineResult<String> {
        Snapshot::capture(Self::KIND, self.revision, &self.state)?.encode()
    }

    fn restore(&mut self, encoded: &str) -> EngineResult<()> {
        let snapshot = Snapshot::decode(encoded)?;
        let revision = snapshot.revision;
        let state: MafiaState = snapshot.into_state(Self::KIND)?;
        state.check()?;
        self.state = state;
        self.revision = revision;
        let phase = self.phase();
        self.observers.notify(&EngineEvent::PhaseChanged {
            game: Self::KIND,
            phase: phase.tag(),
        });
        Ok(())
    }
}
