//! Odd One In: the game master asks a question, everyone answers in turn
//! against a countdown, and the GM knocks out whoever stands out.
//!
//! ```text
//! Lobby → Answering ─ last answer ─→ Judging ─ next_round ─→ Answering
//!                                       │
//!                                       └─ survivors ≤ target ─→ Winner
//! ```
//!
//! Each answering turn carries a token. The countdown's expiry and a manual
//! submission both resolve that token, and whichever lands second is refused.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::assign::rotation_order;
use crate::game::content::{QuestionPool, Tier};
use crate::game::ids::{ParticipantId, SessionCode};
use crate::game::observer::{EngineEvent, Observers};
use crate::game::roster::{self, Participant, Role, Seat};
use crate::game::rules::OddOneInRules;
use crate::game::sync::Snapshot;
use crate::game::timer::{Countdown, Tick, TimerState};
use crate::game::{GameKind, RoleGameEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddRole {
    GameMaster,
    Player,
}

impl Role for OddRole {
    const REMAINDER: Self = OddRole::Player;

    fn label(self) -> &'static str {
        match self {
            OddRole::GameMaster => "Game Master",
            OddRole::Player => "Player",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddPhase {
    Lobby,
    Answering,
    Judging,
    Winner,
}

impl OddPhase {
    pub fn tag(self) -> &'static str {
        match self {
            OddPhase::Lobby => "lobby",
            OddPhase::Answering => "answering",
            OddPhase::Judging => "judging",
            OddPhase::Winner => "winner",
        }
    }
}

/// One recorded answer. A timed-out turn is recorded as an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: ParticipantId,
    pub name: String,
    pub text: String,
}

impl Answer {
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Blanks first, then case-insensitive by answer text. Ties fall back to the
/// name so the order never hints at who answered when.
pub fn judging_order(answers: &mut [Answer]) {
    answers.sort_by(|a, b| {
        (!a.is_blank(), a.text.to_lowercase(), a.name.to_lowercase()).cmp(&(
            !b.is_blank(),
            b.text.to_lowercase(),
            b.name.to_lowercase(),
        ))
    });
}

/// Draw an unused question from the tier matching `alive`. An exhausted tier
/// starts over.
pub fn draw_question<G: Rng + ?Sized>(
    pool: &QuestionPool,
    used: &mut BTreeMap<Tier, BTreeSet<usize>>,
    alive: usize,
    rng: &mut G,
) -> EngineResult<String> {
    let tier = Tier::for_players(alive);
    let questions = pool.tier(tier);
    let usable = |i: &usize| !questions[*i].trim().is_empty();
    let seen = used.entry(tier).or_default();

    let mut fresh: Vec<usize> = (0..questions.len())
        .filter(usable)
        .filter(|i| !seen.contains(i))
        .collect();
    if fresh.is_empty() {
        tracing::debug!(?tier, "question tier exhausted, starting over");
        seen.clear();
        fresh = (0..questions.len()).filter(usable).collect();
    }
    let index = *fresh
        .choose(rng)
        .ok_or_else(|| EngineError::validation(format!("{tier:?} question tier is empty")))?;
    seen.insert(index);
    Ok(questions[index].trim().to_string())
}

/// Who is answering now, for the turn screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnView {
    pub turn: u64,
    pub id: ParticipantId,
    pub name: String,
    pub position: usize,
    pub total: usize,
    pub remaining: u32,
    pub timer: TimerState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OddReport {
    pub survivors: Vec<Seat>,
    pub rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    code: SessionCode,
    phase: OddPhase,
    round: u32,
    participants: Vec<Participant<OddRole>>,
    question: Option<String>,
    used_questions: BTreeMap<Tier, BTreeSet<usize>>,
    order: Vec<ParticipantId>,
    cursor: usize,
    turn: u64,
    answers: Vec<Answer>,
    /// The countdown itself is rebuilt on restore; this carries a pause over.
    #[serde(default)]
    timer_paused: bool,
}

impl Room {
    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn game_master(&self) -> Option<&Participant<OddRole>> {
        self.participants
            .iter()
            .find(|p| p.role() == OddRole::GameMaster)
    }

    pub fn players(&self) -> impl Iterator<Item = &Participant<OddRole>> {
        self.participants
            .iter()
            .filter(|p| p.role() == OddRole::Player)
    }

    fn living_players(&self) -> usize {
        roster::count_alive(&self.participants, |r| r == OddRole::Player)
    }

    fn current_answerer(&self) -> Option<ParticipantId> {
        self.order.get(self.cursor).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OddState {
    rules: OddOneInRules,
    room: Option<Room>,
}

#[derive(Debug)]
pub struct OddOneInEngine {
    state: OddState,
    /// Never serialized: re-armed from `room.turn` on restore.
    countdown: Countdown,
    rng: StdRng,
    observers: Observers,
    revision: u64,
}

impl Default for OddOneInEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OddOneInEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        let rules = OddOneInRules::default();
        Self {
            countdown: Countdown::new(rules.countdown_ticks),
            state: OddState { rules, room: None },
            rng,
            observers: Observers::default(),
            revision: 0,
        }
    }

    pub fn rules(&self) -> &OddOneInRules {
        &self.state.rules
    }

    pub fn set_rules(&mut self, rules: OddOneInRules) -> EngineResult<()> {
        if self.state.room.as_ref().is_some_and(|r| r.phase != OddPhase::Lobby) {
            return Err(EngineError::illegal("Rules are fixed once the game starts"));
        }
        rules.validate()?;
        self.countdown = Countdown::new(rules.countdown_ticks);
        self.state.rules = rules;
        self.revision += 1;
        Ok(())
    }

    // ── Lobby ──────────────────────────────────────────────────────

    /// Open a room run by `game_master`. Returns the GM's id.
    pub fn create_room(&mut self, game_master: &str) -> EngineResult<ParticipantId> {
        if self.state.room.is_some() {
            return Err(EngineError::illegal("A room is already open"));
        }
        let name = game_master.trim();
        if name.is_empty() {
            return Err(EngineError::validation("Game master needs a name"));
        }
        let id = ParticipantId::random(&mut self.rng);
        let code = SessionCode::random(&mut self.rng);
        tracing::info!(%code, gm = name, "odd one in room created");
        self.state.room = Some(Room {
            code,
            phase: OddPhase::Lobby,
            round: 0,
            participants: vec![Participant::new(id, name.to_string(), OddRole::GameMaster, None)],
            question: None,
            used_questions: BTreeMap::new(),
            order: Vec::new(),
            cursor: 0,
            turn: 0,
            answers: Vec::new(),
            timer_paused: false,
        });
        self.enter(OddPhase::Lobby);
        Ok(id)
    }

    pub fn add_player(&mut self, name: &str) -> EngineResult<ParticipantId> {
        let max = usize::from(self.state.rules.max_players);
        let id = ParticipantId::random(&mut self.rng);
        let room = self.in_phase_mut(OddPhase::Lobby)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("Player name cannot be empty"));
        }
        let lower = name.to_lowercase();
        if room
            .participants
            .iter()
            .any(|p| p.name().to_lowercase() == lower)
        {
            return Err(EngineError::validation(format!("{name} is already in the room")));
        }
        if room.players().count() >= max {
            return Err(EngineError::validation(format!("The room is full ({max} players)")));
        }
        room.participants
            .push(Participant::new(id, name.to_string(), OddRole::Player, None));
        tracing::debug!(name, "player joined");
        self.revision += 1;
        Ok(id)
    }

    pub fn remove_player(&mut self, id: ParticipantId) -> EngineResult<()> {
        let room = self.in_phase_mut(OddPhase::Lobby)?;
        let p = roster::find(&room.participants, id)
            .ok_or_else(|| EngineError::validation(format!("Unknown participant {id}")))?;
        if p.role() == OddRole::GameMaster {
            return Err(EngineError::validation("The game master cannot be removed"));
        }
        room.participants.retain(|p| p.id() != id);
        self.revision += 1;
        Ok(())
    }

    pub fn start_game(&mut self) -> EngineResult<()> {
        let min = usize::from(self.state.rules.min_players);
        let room = self.in_phase(OddPhase::Lobby)?;
        let players = room.players().count();
        if players < min {
            return Err(EngineError::validation(format!(
                "Need at least {min} players (have {players})"
            )));
        }
        self.begin_round()
    }

    /// Close the room entirely.
    pub fn close_room(&mut self) {
        self.countdown.cancel();
        self.state.room = None;
        self.revision += 1;
    }

    // ── Answering ──────────────────────────────────────────────────

    fn begin_round(&mut self) -> EngineResult<()> {
        let room = self
            .state
            .room
            .as_mut()
            .ok_or_else(|| EngineError::illegal("No room is open"))?;
        let alive = room.living_players();
        let question = draw_question(
            &self.state.rules.questions,
            &mut room.used_questions,
            alive,
            &mut self.rng,
        )?;
        let living: Vec<ParticipantId> = room
            .players()
            .filter(|p| p.is_alive())
            .map(|p| p.id())
            .collect();
        room.order = rotation_order(living.len(), &mut self.rng)
            .into_iter()
            .map(|i| living[i])
            .collect();
        room.round += 1;
        room.question = Some(question);
        room.cursor = 0;
        room.answers.clear();
        tracing::info!(round = room.round, alive, "odd one in round started");
        self.enter(OddPhase::Answering);
        self.start_turn()
    }

    fn start_turn(&mut self) -> EngineResult<()> {
        let room = self.room_mut()?;
        room.turn += 1;
        room.timer_paused = false;
        let turn = room.turn;
        self.countdown.start(turn);
        self.revision += 1;
        Ok(())
    }

    pub fn question(&self) -> EngineResult<&str> {
        let room = self.room()?;
        match room.phase {
            OddPhase::Answering | OddPhase::Judging => room
                .question
                .as_deref()
                .ok_or_else(|| EngineError::illegal("No question drawn")),
            other => Err(EngineError::illegal(format!("No question during {}", other.tag()))),
        }
    }

    /// Throw the question away, draw another and restart the answers.
    pub fn skip_question(&mut self) -> EngineResult<String> {
        let room = self
            .state
            .room
            .as_mut()
            .ok_or_else(|| EngineError::illegal("No room is open"))?;
        if room.phase != OddPhase::Answering {
            return Err(EngineError::illegal("Questions can only be skipped while answering"));
        }
        let alive = room.living_players();
        let question = draw_question(
            &self.state.rules.questions,
            &mut room.used_questions,
            alive,
            &mut self.rng,
        )?;
        room.question = Some(question.clone());
        room.cursor = 0;
        room.answers.clear();
        self.countdown.cancel();
        self.start_turn()?;
        Ok(question)
    }

    /// Reword the current question; answers so far stand, the clock restarts.
    pub fn edit_question(&mut self, text: &str) -> EngineResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::validation("Question cannot be empty"));
        }
        let room = self.in_phase_mut(OddPhase::Answering)?;
        room.question = Some(text.to_string());
        room.timer_paused = false;
        self.countdown.reset()?;
        self.revision += 1;
        Ok(())
    }

    pub fn current_turn(&self) -> EngineResult<TurnView> {
        let room = self.in_phase(OddPhase::Answering)?;
        let id = room
            .current_answerer()
            .ok_or_else(|| EngineError::illegal("Everyone has answered"))?;
        let p = roster::find(&room.participants, id)
            .ok_or_else(|| EngineError::validation(format!("Unknown participant {id}")))?;
        Ok(TurnView {
            turn: room.turn,
            id,
            name: p.name().to_string(),
            position: room.cursor,
            total: room.order.len(),
            remaining: self.countdown.remaining(),
            timer: self.countdown.state(),
        })
    }

    /// Record the answer for `turn`. A turn already closed by the countdown
    /// (or a previous submit) is refused.
    pub fn submit_answer(&mut self, turn: u64, text: &str) -> EngineResult<()> {
        let room = self.in_phase(OddPhase::Answering)?;
        if turn != room.turn {
            return Err(EngineError::illegal(format!(
                "Turn {turn} is already closed (current turn {})",
                room.turn
            )));
        }
        self.record_answer(text.trim().to_string())
    }

    fn record_answer(&mut self, text: String) -> EngineResult<()> {
        self.countdown.cancel();
        let room = self.room_mut()?;
        let id = room
            .current_answerer()
            .ok_or_else(|| EngineError::illegal("Everyone has answered"))?;
        let name = roster::find(&room.participants, id)
            .map(|p| p.name().to_string())
            .ok_or_else(|| EngineError::validation(format!("Unknown participant {id}")))?;
        room.answers.push(Answer { id, name, text });
        room.cursor += 1;
        let done = room.cursor >= room.order.len();
        if done {
            self.enter(OddPhase::Judging);
            Ok(())
        } else {
            self.start_turn()
        }
    }

    /// Drive the countdown one step. Expiry submits a blank for the turn.
    pub fn tick(&mut self) -> EngineResult<Tick> {
        if self.state.room.as_ref().map(|r| r.phase) != Some(OddPhase::Answering) {
            return Ok(Tick::Ignored);
        }
        let tick = self.countdown.tick();
        match tick {
            Tick::Running { remaining } => {
                self.observers.notify(&EngineEvent::Tick { remaining });
            }
            Tick::Expired { turn } => {
                self.observers.notify(&EngineEvent::Tick { remaining: 0 });
                if self.room()?.turn == turn {
                    tracing::debug!(turn, "answer timed out");
                    self.record_answer(String::new())?;
                }
            }
            Tick::Paused { .. } | Tick::Ignored => {}
        }
        Ok(tick)
    }

    pub fn pause_timer(&mut self) -> EngineResult<()> {
        self.in_phase(OddPhase::Answering)?;
        self.countdown.pause()?;
        self.room_mut()?.timer_paused = true;
        self.revision += 1;
        Ok(())
    }

    pub fn resume_timer(&mut self) -> EngineResult<()> {
        self.in_phase(OddPhase::Answering)?;
        self.countdown.resume()?;
        self.room_mut()?.timer_paused = false;
        self.revision += 1;
        Ok(())
    }

    pub fn reset_timer(&mut self) -> EngineResult<()> {
        self.in_phase(OddPhase::Answering)?;
        self.countdown.reset()?;
        self.room_mut()?.timer_paused = false;
        self.revision += 1;
        Ok(())
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    // ── Judging ────────────────────────────────────────────────────

    pub fn judged_answers(&self) -> EngineResult<Vec<Answer>> {
        let room = self.in_phase(OddPhase::Judging)?;
        let mut answers = room.answers.clone();
        judging_order(&mut answers);
        Ok(answers)
    }

    pub fn eliminate(&mut self, id: ParticipantId) -> EngineResult<Seat> {
        let survivors = usize::from(self.state.rules.survivors_to_win);
        let room = self.in_phase_mut(OddPhase::Judging)?;
        let p = roster::find_mut(&mut room.participants, id)
            .ok_or_else(|| EngineError::validation(format!("Unknown participant {id}")))?;
        if p.role() == OddRole::GameMaster {
            return Err(EngineError::validation("The game master is not playing"));
        }
        if !p.eliminate() {
            return Err(EngineError::validation(format!("{} is already out", p.name())));
        }
        let seat = p.seat();
        let left = room.living_players();
        tracing::info!(name = %seat.name, left, "participant eliminated");
        self.observers.notify(&EngineEvent::Eliminated {
            id: seat.id,
            name: seat.name.clone(),
        });
        if left <= survivors {
            self.finish();
        } else {
            self.revision += 1;
        }
        Ok(seat)
    }

    pub fn next_round(&mut self) -> EngineResult<()> {
        self.in_phase(OddPhase::Judging)?;
        self.begin_round()
    }

    pub fn winner(&self) -> Option<OddReport> {
        let room = self.state.room.as_ref()?;
        (room.phase == OddPhase::Winner).then(|| OddReport {
            survivors: room
                .players()
                .filter(|p| p.is_alive())
                .map(Participant::seat)
                .collect(),
            rounds: room.round,
        })
    }

    pub fn phase(&self) -> Option<OddPhase> {
        self.state.room.as_ref().map(|r| r.phase)
    }

    pub fn seats(&self) -> Vec<Seat> {
        self.state
            .room
            .as_ref()
            .map(|r| r.participants.iter().map(Participant::seat).collect())
            .unwrap_or_default()
    }

    pub fn room_state(&self) -> Option<&Room> {
        self.state.room.as_ref()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn room(&self) -> EngineResult<&Room> {
        self.state
            .room
            .as_ref()
            .ok_or_else(|| EngineError::illegal("No room is open"))
    }

    fn room_mut(&mut self) -> EngineResult<&mut Room> {
        self.state
            .room
            .as_mut()
            .ok_or_else(|| EngineError::illegal("No room is open"))
    }

    fn in_phase(&self, phase: OddPhase) -> EngineResult<&Room> {
        let room = self.room()?;
        if room.phase != phase {
            return Err(EngineError::illegal(format!(
                "Expected {} phase, currently {}",
                phase.tag(),
                room.phase.tag()
            )));
        }
        Ok(room)
    }

    fn in_phase_mut(&mut self, phase: OddPhase) -> EngineResult<&mut Room> {
        self.in_phase(phase)?;
        self.room_mut()
    }

    fn finish(&mut self) {
        self.countdown.cancel();
        self.enter(OddPhase::Winner);
        let names: Vec<String> = self
            .winner()
            .map(|r| r.survivors.into_iter().map(|s| s.name).collect())
            .unwrap_or_default();
        let winner = names.join(" & ");
        tracing::info!(%winner, "odd one in game over");
        self.observers.notify(&EngineEvent::GameOver {
            game: GameKind::OddOneIn,
            winner,
        });
    }

    fn enter(&mut self, phase: OddPhase) {
        if let Some(room) = self.state.room.as_mut() {
            room.phase = phase;
        }
        self.revision += 1;
        tracing::debug!(phase = phase.tag(), "odd one in phase changed");
        self.observers.notify(&EngineEvent::PhaseChanged {
            game: GameKind::OddOneIn,
            phase: phase.tag(),
        });
    }
}

impl RoleGameEngine for OddOneInEngine {
    const KIND: GameKind = GameKind::OddOneIn;

    fn phase_tag(&self) -> &'static str {
        self.phase().map_or("no_room", OddPhase::tag)
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&EngineEvent)>) {
        self.observers.subscribe(listener);
    }

    /// Same GM and players in a brand-new room, straight into round one.
    fn play_again(&mut self) -> EngineResult<()> {
        self.countdown.cancel();
        let room = self.room()?;
        let gm = room
            .game_master()
            .map(|p| p.name().to_string())
            .ok_or_else(|| EngineError::illegal("Room has no game master"))?;
        let players: Vec<String> = room.players().map(|p| p.name().to_string()).collect();

        self.state.room = None;
        self.create_room(&gm)?;
        for name in &players {
            self.add_player(name)?;
        }
        self.start_game()
    }

    fn snapshot(&self) -> EngineResult<String> {
        Snapshot::capture(Self::KIND, self.revision, &self.state)?.encode()
    }

    fn restore(&mut self, encoded: &str) -> EngineResult<()> {
        let snapshot = Snapshot::decode(encoded)?;
        let revision = snapshot.revision;
        let state: OddState = snapshot.into_state(Self::KIND)?;
        state
            .rules
            .validate()
            .map_err(|e| EngineError::snapshot(format!("Snapshot carries bad rules: {e}")))?;
        self.countdown.cancel();
        let mut countdown = Countdown::new(state.rules.countdown_ticks);
        if let Some(room) = state.room.as_ref().filter(|r| r.phase == OddPhase::Answering) {
            countdown.start(room.turn);
            if room.timer_paused {
                countdown.pause()?;
            }
        }
        self.countdown = countdown;
        self.state = state;
        self.revision = revision;
        let phase = self.phase_tag();
        self.observers.notify(&EngineEvent::PhaseChanged {
            game: Self::KIND,
            phase,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(seed: u64) -> OddOneInEngine {
        OddOneInEngine::with_rng(StdRng::seed_from_u64(seed))
    }

    fn lobby(seed: u64, players: &[&str]) -> OddOneInEngine {
        let mut e = engine(seed);
        e.create_room("Gemma").unwrap();
        for name in players {
            e.add_player(name).unwrap();
        }
        e
    }

    fn started(seed: u64, players: &[&str]) -> OddOneInEngine {
        let mut e = lobby(seed, players);
        e.start_game().unwrap();
        e
    }

    fn answer(e: &mut OddOneInEngine, text: &str) {
        let turn = e.current_turn().unwrap().turn;
        e.submit_answer(turn, text).unwrap();
    }

    fn run_out_clock(e: &mut OddOneInEngine) -> Tick {
        let mut last = Tick::Ignored;
        for _ in 0..e.rules().countdown_ticks {
            last = e.tick().unwrap();
        }
        last
    }

    #[test]
    fn judged_order_puts_blanks_first() {
        let id = ParticipantId::random(&mut StdRng::seed_from_u64(1));
        let mut answers: Vec<Answer> = ["zebra", "", "apple"]
            .iter()
            .enumerate()
            .map(|(i, t)| Answer {
                id,
                name: format!("P{i}"),
                text: t.to_string(),
            })
            .collect();
        judging_order(&mut answers);
        let texts: Vec<&str> = answers.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, ["", "apple", "zebra"]);
    }

    #[test]
    fn judged_order_ignores_case() {
        let id = ParticipantId::random(&mut StdRng::seed_from_u64(1));
        let mut answers: Vec<Answer> = ["banana", "Apple", "cherry"]
            .iter()
            .map(|t| Answer {
                id,
                name: "x".into(),
                text: t.to_string(),
            })
            .collect();
        judging_order(&mut answers);
        assert_eq!(answers[0].text, "Apple");
    }

    #[test]
    fn lobby_rejects_duplicate_names_any_case() {
        let mut e = lobby(2, &["Ana"]);
        assert!(e.add_player("ana").unwrap_err().is_validation());
        assert!(e.add_player("GEMMA").unwrap_err().is_validation());
        assert!(e.add_player("   ").unwrap_err().is_validation());
    }

    #[test]
    fn game_master_cannot_be_removed() {
        let mut e = engine(3);
        let gm = e.create_room("Gemma").unwrap();
        let ana = e.add_player("Ana").unwrap();
        assert!(e.remove_player(gm).unwrap_err().is_validation());
        e.remove_player(ana).unwrap();
        assert_eq!(e.seats().len(), 1);
    }

    #[test]
    fn start_needs_three_players() {
        let mut e = lobby(4, &["Ana", "Ben"]);
        assert!(e.start_game().unwrap_err().is_validation());
        e.add_player("Cy").unwrap();
        e.start_game().unwrap();
        assert_eq!(e.phase(), Some(OddPhase::Answering));
        let narrow = &e.rules().questions.narrow;
        assert!(narrow.iter().any(|q| q == e.question().unwrap()));
    }

    #[test]
    fn game_master_never_takes_a_turn() {
        let mut e = started(5, &["Ana", "Ben", "Cy"]);
        let gm = e.room_state().unwrap().game_master().unwrap().id();
        for _ in 0..3 {
            assert_ne!(e.current_turn().unwrap().id, gm);
            answer(&mut e, "x");
        }
        assert_eq!(e.phase(), Some(OddPhase::Judging));
    }

    #[test]
    fn expiry_submits_blank_once() {
        let mut e = started(6, &["Ana", "Ben", "Cy"]);
        let turn = e.current_turn().unwrap().turn;
        assert!(matches!(run_out_clock(&mut e), Tick::Expired { turn: t } if t == turn));

        // The manual submit for the same turn arrives too late.
        let err = e.submit_answer(turn, "late").unwrap_err();
        assert!(err.is_illegal_transition());
        let room = e.room_state().unwrap();
        assert_eq!(room.answers.len(), 1);
        assert!(room.answers[0].is_blank());
        assert_eq!(e.current_turn().unwrap().position, 1);
    }

    #[test]
    fn manual_submit_cancels_the_clock() {
        let mut e = started(7, &["Ana", "Ben", "Cy"]);
        e.tick().unwrap();
        let turn = e.current_turn().unwrap().turn;
        e.submit_answer(turn, "pear").unwrap();
        // next turn starts at full time
        assert_eq!(e.current_turn().unwrap().remaining, e.rules().countdown_ticks);
        assert!(e.submit_answer(turn, "pear again").unwrap_err().is_illegal_transition());
    }

    #[test]
    fn judged_answers_from_a_played_round() {
        let mut e = started(8, &["Ana", "Ben", "Cy"]);
        answer(&mut e, "zebra");
        run_out_clock(&mut e);
        answer(&mut e, "apple");
        let texts: Vec<String> = e
            .judged_answers()
            .unwrap()
            .into_iter()
            .map(|a| a.text)
            .collect();
        assert_eq!(texts, ["", "apple", "zebra"]);
    }

    #[test]
    fn paused_clock_does_not_expire() {
        let mut e = started(9, &["Ana", "Ben", "Cy"]);
        e.pause_timer().unwrap();
        for _ in 0..50 {
            assert!(matches!(e.tick().unwrap(), Tick::Paused { .. }));
        }
        assert!(e.pause_timer().unwrap_err().is_illegal_transition());
        e.resume_timer().unwrap();
        e.tick().unwrap();
        e.reset_timer().unwrap();
        assert_eq!(e.current_turn().unwrap().remaining, e.rules().countdown_ticks);
    }

    #[test]
    fn skip_and_edit_restart_the_clock() {
        let mut e = started(10, &["Ana", "Ben", "Cy"]);
        let first = e.question().unwrap().to_string();
        answer(&mut e, "x");
        e.tick().unwrap();
        let skipped = e.skip_question().unwrap();
        assert_ne!(skipped, first);
        assert_eq!(e.current_turn().unwrap().position, 0);
        assert_eq!(e.current_turn().unwrap().remaining, e.rules().countdown_ticks);

        e.tick().unwrap();
        e.edit_question("Name a green fruit").unwrap();
        assert_eq!(e.question().unwrap(), "Name a green fruit");
        assert_eq!(e.current_turn().unwrap().remaining, e.rules().countdown_ticks);
        assert!(e.edit_question("  ").unwrap_err().is_validation());
    }

    #[test]
    fn exhausted_tier_starts_over() {
        let mut pool = crate::game::content::default_questions();
        pool.narrow = vec!["A?".into(), "B?".into()];
        let mut used = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(11);
        let a = draw_question(&pool, &mut used, 3, &mut rng).unwrap();
        let b = draw_question(&pool, &mut used, 3, &mut rng).unwrap();
        assert_ne!(a, b);
        let c = draw_question(&pool, &mut used, 3, &mut rng).unwrap();
        assert!(c == "A?" || c == "B?");
        assert_eq!(used[&Tier::Narrow].len(), 1);
    }

    #[test]
    fn last_player_standing_wins() {
        let mut e = started(12, &["Ana", "Ben", "Cy"]);
        for _ in 0..3 {
            answer(&mut e, "same");
        }
        let ids: Vec<ParticipantId> = e.room_state().unwrap().players().map(|p| p.id()).collect();
        e.eliminate(ids[0]).unwrap();
        assert!(e.eliminate(ids[0]).unwrap_err().is_validation());
        e.next_round().unwrap();
        assert_eq!(e.room_state().unwrap().round(), 2);
        for _ in 0..2 {
            answer(&mut e, "odd");
        }
        e.eliminate(ids[1]).unwrap();
        let report = e.winner().unwrap();
        assert_eq!(report.survivors.len(), 1);
        assert_eq!(report.survivors[0].id, ids[2]);
        assert_eq!(report.rounds, 2);
        assert_eq!(e.tick().unwrap(), Tick::Ignored);
    }

    #[test]
    fn play_again_cancels_clock_and_reseats() {
        let mut e = started(13, &["Ana", "Ben", "Cy"]);
        e.tick().unwrap();
        e.tick().unwrap();
        let old_code = e.room_state().unwrap().code().clone();
        e.play_again().unwrap();
        let room = e.room_state().unwrap();
        assert_ne!(room.code(), &old_code);
        assert_eq!(room.round(), 1);
        assert_eq!(room.players().count(), 3);
        assert!(room.players().all(|p| p.is_alive()));
        assert_eq!(e.phase(), Some(OddPhase::Answering));
        assert_eq!(e.countdown().remaining(), e.rules().countdown_ticks);
        assert_eq!(e.current_turn().unwrap().turn, 1);
    }

    #[test]
    fn restore_rearms_the_countdown() {
        let mut e = started(14, &["Ana", "Ben", "Cy"]);
        answer(&mut e, "kiwi");
        e.tick().unwrap();
        e.tick().unwrap();
        let turn = e.current_turn().unwrap().turn;
        let encoded = e.snapshot().unwrap();

        let mut other = engine(0);
        other.restore(&encoded).unwrap();
        let view = other.current_turn().unwrap();
        assert_eq!(view.turn, turn);
        assert_eq!(view.remaining, other.rules().countdown_ticks);
        assert_eq!(view.timer, TimerState::Running);
        other.submit_answer(turn, "fig").unwrap();
        assert_eq!(other.room_state().unwrap().answers.len(), 2);
    }

    #[test]
    fn restore_keeps_a_paused_clock_paused() {
        let mut e = started(15, &["Ana", "Ben", "Cy"]);
        e.pause_timer().unwrap();
        let turn = e.current_turn().unwrap().turn;

        let mut other = engine(0);
        other.restore(&e.snapshot().unwrap()).unwrap();
        assert_eq!(other.current_turn().unwrap().timer, TimerState::Paused);
        for _ in 0..other.rules().countdown_ticks + 1 {
            assert!(matches!(other.tick().unwrap(), Tick::Paused { .. }));
        }
        assert!(other.room_state().unwrap().answers.is_empty());

        other.resume_timer().unwrap();
        let resumed = Snapshot::decode(&other.snapshot().unwrap()).unwrap();
        assert_eq!(resumed.state["room"]["timer_paused"], serde_json::json!(false));
        other.submit_answer(turn, "plum").unwrap();
        assert_eq!(other.current_turn().unwrap().timer, TimerState::Running);
    }

    #[test]
    fn restore_rejects_bad_rules() {
        let mut e = lobby(16, &["Ana"]);
        let mut snap = Snapshot::decode(&e.snapshot().unwrap()).unwrap();
        snap.state["rules"]["countdown_ticks"] = serde_json::json!(0);
        assert_eq!(e.restore(&snap.encode().unwrap()).unwrap_err().kind(), "snapshot");
        assert_eq!(e.rules().countdown_ticks, 10);
        assert_eq!(e.seats().len(), 2);
    }
}
