//! Undercover: word bluffing with agents, spies and Mr. White.
//!
//! Agents hold the majority word, spies the minority word, Mr. White holds
//! nothing. Agents and spies see the same "Spy / Agent" card so neither can
//! tell which side they are on; only Mr. White is told who he is.
//!
//! ```text
//! Setup → RoleViewing → Discussion ─ eliminate ─→ Discussion (next round)
//!                           │                        ↑
//!                           └→ MrWhiteGuess ─ miss ──┘
//! any elimination or guess may end in → Winner
//! ```

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::content::WordPair;
use crate::game::ids::ParticipantId;
use crate::game::observer::{EngineEvent, Observers};
use crate::game::roster::{Role, RoleConfig, RosterEntry, Seat, validate_names};
use crate::game::rules::UndercoverRules;
use crate::game::session::Session;
use crate::game::sync::Snapshot;
use crate::game::{GameKind, RoleGameEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndercoverRole {
    MrWhite,
    Spy,
    Agent,
}

impl Role for UndercoverRole {
    const REMAINDER: Self = UndercoverRole::Agent;

    fn label(self) -> &'static str {
        match self {
            UndercoverRole::MrWhite => "Mr. White",
            UndercoverRole::Spy => "Spy",
            UndercoverRole::Agent => "Agent",
        }
    }
}

/// Label shown to both word holders.
pub const AMBIGUOUS_LABEL: &str = "Spy / Agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndercoverPhase {
    Setup,
    RoleViewing,
    Discussion,
    MrWhiteGuess,
    Winner,
}

impl UndercoverPhase {
    pub fn tag(self) -> &'static str {
        match self {
            UndercoverPhase::Setup => "setup",
            UndercoverPhase::RoleViewing => "role_viewing",
            UndercoverPhase::Discussion => "discussion",
            UndercoverPhase::MrWhiteGuess => "mr_white_guess",
            UndercoverPhase::Winner => "winner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "team", rename_all = "snake_case")]
pub enum UndercoverWinner {
    Agents,
    /// Spies (with any eliminated Mr. White) reached parity.
    Spies,
    MrWhite { id: ParticipantId },
}

impl UndercoverWinner {
    pub fn label(self) -> &'static str {
        match self {
            UndercoverWinner::Agents => "Agents",
            UndercoverWinner::Spies => "Spies",
            UndercoverWinner::MrWhite { .. } => "Mr. White",
        }
    }
}

/// What the current viewer is shown. Agents and spies are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "card", rename_all = "snake_case")]
pub enum CardView {
    Word { label: &'static str, word: String },
    MrWhite { label: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndercoverCard {
    pub name: String,
    #[serde(flatten)]
    pub view: CardView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndercoverReport {
    pub winner: UndercoverWinner,
    pub words: WordPair,
    pub roster: Vec<RosterEntry<UndercoverRole>>,
}

/// Result of Mr. White's guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessOutcome {
    Correct,
    Wrong,
}

fn same_word(guess: &str, word: &str) -> bool {
    guess.trim().to_lowercase() == word.trim().to_lowercase()
}

/// Both words must be named; order does not matter.
pub fn guess_matches(words: &WordPair, first: &str, second: &str) -> bool {
    let straight = same_word(first, &words.majority) && same_word(second, &words.minority);
    let crossed = same_word(first, &words.minority) && same_word(second, &words.majority);
    straight || crossed
}

/// Agents win once every spy and Mr. White is out. Spies win at parity, but
/// only after Mr. White is gone: while he is seated his guess is the way out.
/// Once no agent is left the impostors have outlasted them, the spies if any
/// survive, otherwise the first Mr. White still seated.
pub fn check_win(session: &Session<UndercoverRole>) -> Option<UndercoverWinner> {
    let agents = session.count_alive(|r| r == UndercoverRole::Agent);
    let spies = session.count_alive(|r| r == UndercoverRole::Spy);
    let whites = session.count_alive(|r| r == UndercoverRole::MrWhite);
    if spies + whites == 0 {
        Some(UndercoverWinner::Agents)
    } else if agents == 0 && spies == 0 {
        session
            .participants()
            .iter()
            .find(|p| p.is_alive() && p.role() == UndercoverRole::MrWhite)
            .map(|p| UndercoverWinner::MrWhite { id: p.id() })
    } else if (whites == 0 || agents == 0) && spies >= agents {
        Some(UndercoverWinner::Spies)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndercoverGame {
    session: Session<UndercoverRole>,
    phase: UndercoverPhase,
    words: WordPair,
    first_speaker: Option<ParticipantId>,
    guesser: Option<ParticipantId>,
    winner: Option<UndercoverWinner>,
}

impl UndercoverGame {
    pub fn session(&self) -> &Session<UndercoverRole> {
        &self.session
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UndercoverState {
    rules: UndercoverRules,
    config: RoleConfig<UndercoverRole>,
    game: Option<UndercoverGame>,
}

impl UndercoverState {
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
pub struct UndercoverEngine {
    state: UndercoverState,
    rng: StdRng,
    observers: Observers,
    revision: u64,
}

impl Default for UndercoverEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndercoverEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        let rules = UndercoverRules::default();
        let config = RoleConfig::new(rules.players, rules.default_players, &rules.roles);
        Self {
            state: UndercoverState {
                rules,
                config,
                game: None,
            },
            rng,
            observers: Observers::default(),
            revision: 0,
        }
    }

    pub fn rules(&self) -> &UndercoverRules {
        &self.state.rules
    }

    pub fn set_rules(&mut self, rules: UndercoverRules) -> EngineResult<()> {
        self.require_setup()?;
        rules.validate()?;
        self.state.config = RoleConfig::new(rules.players, rules.default_players, &rules.roles);
        self.state.rules = rules;
        self.revision += 1;
        Ok(())
    }

    pub fn config(&self) -> &RoleConfig<UndercoverRole> {
        &self.state.config
    }

    pub fn set_total_players(&mut self, n: i32) -> EngineResult<u8> {
        self.require_setup()?;
        let total = self.state.config.set_total_players(n);
        self.revision += 1;
        Ok(total)
    }

    pub fn set_role_count(&mut self, role: UndercoverRole, n: i32) -> EngineResult<u8> {
        self.require_setup()?;
        let count = self.state.config.set_role_count(role, n)?;
        self.revision += 1;
        Ok(count)
    }

    /// Start-time checks on top of the shared remainder rule.
    fn check_balance(&self) -> EngineResult<()> {
        let config = &self.state.config;
        let whites = i32::from(config.role_count(UndercoverRole::MrWhite));
        let spies = i32::from(config.role_count(UndercoverRole::Spy));
        if whites + spies == 0 {
            return Err(EngineError::validation("Need at least one Mr. White or spy"));
        }
        let agents = config.remainder();
        if agents <= whites + spies {
            return Err(EngineError::validation(format!(
                "Agents ({agents}) must outnumber spies and Mr. White ({})",
                whites + spies
            )));
        }
        Ok(())
    }

    pub fn start_game(&mut self, names: &[String]) -> EngineResult<()> {
        self.require_setup()?;
        self.launch(names)
    }

    fn launch(&mut self, names: &[String]) -> EngineResult<()> {
        let names = validate_names(names, usize::from(self.state.config.total_players()))?;
        self.check_balance()?;
        let roles = self.state.config.role_multiset()?;
        let words = self
            .state
            .rules
            .word_pairs
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| EngineError::validation("Word pool is empty"))?;

        let session = Session::start(names, roles, &mut self.rng, |role| match role {
            UndercoverRole::Agent => Some(words.majority.clone()),
            UndercoverRole::Spy => Some(words.minority.clone()),
            UndercoverRole::MrWhite => None,
        });
        tracing::info!(code = %session.code(), players = session.participants().len(), "undercover game started");
        self.state.game = Some(UndercoverGame {
            session,
            phase: UndercoverPhase::RoleViewing,
            words,
            first_speaker: None,
            guesser: None,
            winner: None,
        });
        self.enter(UndercoverPhase::RoleViewing);
        Ok(())
    }

    pub fn end_game(&mut self) {
        self.state.game = None;
        self.enter(UndercoverPhase::Setup);
    }

    // ── Reveal walk ────────────────────────────────────────────────

    pub fn current_reveal(&self) -> EngineResult<UndercoverCard> {
        let game = self.in_phase(UndercoverPhase::RoleViewing)?;
        let p = game
            .session
            .current_viewer()
            .ok_or_else(|| EngineError::illegal("Reveal walk is already complete"))?;
        let view = match (p.role(), p.secret()) {
            (UndercoverRole::MrWhite, _) | (_, None) => CardView::MrWhite {
                label: UndercoverRole::MrWhite.label(),
            },
            (_, Some(word)) => CardView::Word {
                label: AMBIGUOUS_LABEL,
                word: word.to_string(),
            },
        };
        Ok(UndercoverCard {
            name: p.name().to_string(),
            view,
        })
    }

    pub fn next_viewer_name(&self) -> EngineResult<Option<String>> {
        let game = self.in_phase(UndercoverPhase::RoleViewing)?;
        Ok(game.session.next_viewer_name().map(str::to_string))
    }

    pub fn advance_viewer(&mut self) -> EngineResult<()> {
        let game = self.in_phase_mut(UndercoverPhase::RoleViewing)?;
        if game.session.advance_viewer()? {
            self.open_discussion()?;
        } else {
            self.revision += 1;
        }
        Ok(())
    }

    /// Full roles and both words. Only once the game is over: there is no
    /// moderator in this game to show them to earlier.
    pub fn overview(&self) -> EngineResult<Vec<RosterEntry<UndercoverRole>>> {
        let game = self.in_phase(UndercoverPhase::Winner)?;
        Ok(game.session.roster())
    }

    // ── Discussion ─────────────────────────────────────────────────

    /// Pick who opens this round's clues and enter discussion.
    fn open_discussion(&mut self) -> EngineResult<()> {
        let game = self
            .state
            .game
            .as_mut()
            .ok_or_else(|| EngineError::illegal("No game in progress"))?;
        let speaker = game
            .session
            .living_seats()
            .choose(&mut self.rng)
            .map(|s| s.id);
        game.first_speaker = speaker;
        game.guesser = None;
        self.enter(UndercoverPhase::Discussion);
        Ok(())
    }

    pub fn first_speaker(&self) -> EngineResult<Seat> {
        let game = self.in_phase(UndercoverPhase::Discussion)?;
        let id = game
            .first_speaker
            .ok_or_else(|| EngineError::illegal("No speaker chosen"))?;
        Ok(game.session.participant(id)?.seat())
    }

    /// The table voted `id` out. Mr. White gets a guess before anything else.
    pub fn eliminate(&mut self, id: ParticipantId) -> EngineResult<Seat> {
        let game = self.in_phase_mut(UndercoverPhase::Discussion)?;
        let role = game.session.living(id)?.role();
        let seat = game.session.eliminate(id)?;
        tracing::info!(name = %seat.name, "participant eliminated");
        self.observers.notify(&EngineEvent::Eliminated {
            id: seat.id,
            name: seat.name.clone(),
        });

        if role == UndercoverRole::MrWhite {
            self.game_mut()?.guesser = Some(id);
            self.enter(UndercoverPhase::MrWhiteGuess);
        } else {
            self.next_round_or_finish()?;
        }
        Ok(seat)
    }

    pub fn guesser(&self) -> Option<Seat> {
        let game = self.state.game.as_ref()?;
        let id = game.guesser?;
        game.session.participant(id).ok().map(|p| p.seat())
    }

    pub fn submit_guess(&mut self, first: &str, second: &str) -> EngineResult<GuessOutcome> {
        let game = self.in_phase_mut(UndercoverPhase::MrWhiteGuess)?;
        if first.trim().is_empty() || second.trim().is_empty() {
            return Err(EngineError::validation("Both words must be guessed"));
        }
        let guesser = game
            .guesser
            .ok_or_else(|| EngineError::illegal("No guess is pending"))?;
        let correct = guess_matches(&game.words, first, second);
        game.guesser = None;
        tracing::info!(correct, "mr. white guessed");

        if correct {
            self.finish(UndercoverWinner::MrWhite { id: guesser });
            Ok(GuessOutcome::Correct)
        } else {
            self.next_round_or_finish()?;
            Ok(GuessOutcome::Wrong)
        }
    }

    fn next_round_or_finish(&mut self) -> EngineResult<()> {
        let game = self.game_mut()?;
        if let Some(winner) = check_win(&game.session) {
            self.finish(winner);
            return Ok(());
        }
        let round = game.session.next_round();
        tracing::info!(round, "undercover round advanced");
        self.open_discussion()
    }

    // ── Results ────────────────────────────────────────────────────

    pub fn winner(&self) -> Option<UndercoverReport> {
        let game = self.state.game.as_ref()?;
        game.winner.map(|winner| UndercoverReport {
            winner,
            words: game.words.clone(),
            roster: game.session.roster(),
        })
    }

    pub fn phase(&self) -> UndercoverPhase {
        self.state
            .game
            .as_ref()
            .map_or(UndercoverPhase::Setup, |g| g.phase)
    }

    pub fn round(&self) -> Option<u32> {
        self.state.game.as_ref().map(|g| g.session.round())
    }

    pub fn seats(&self) -> Vec<Seat> {
        self.state
            .game
            .as_ref()
            .map(|g| g.session.seats())
            .unwrap_or_default()
    }

    pub fn game_state(&self) -> Option<&UndercoverGame> {
        self.state.game.as_ref()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn require_setup(&self) -> EngineResult<()> {
        if self.state.game.is_some() {
            return Err(EngineError::illegal("A game is already in progress"));
        }
        Ok(())
    }

    fn game_mut(&mut self) -> EngineResult<&mut UndercoverGame> {
        self.state
            .game
            .as_mut()
            .ok_or_else(|| EngineError::illegal("No game in progress"))
    }

    fn in_phase(&self, phase: UndercoverPhase) -> EngineResult<&UndercoverGame> {
        let game = self
            .state
            .game
            .as_ref()
            .ok_or_else(|| EngineError::illegal("No game in progress"))?;
        if game.phase != phase {
            return Err(EngineError::illegal(format!(
                "Expected {} phase, currently {}",
                phase.tag(),
                game.phase.tag()
            )));
        }
        Ok(game)
    }

    fn in_phase_mut(&mut self, phase: UndercoverPhase) -> EngineResult<&mut UndercoverGame> {
        self.in_phase(phase)?;
        self.game_mut()
    }

    fn finish(&mut self, winner: UndercoverWinner) {
        if let Some(game) = self.state.game.as_mut() {
            game.winner = Some(winner);
            game.first_speaker = None;
        }
        tracing::info!(winner = winner.label(), "undercover game over");
        self.enter(UndercoverPhase::Winner);
        self.observers.notify(&EngineEvent::GameOver {
            game: GameKind::Undercover,
            winner: winner.label().to_string(),
        });
    }

    fn enter(&mut self, phase: UndercoverPhase) {
        if let Some(game) = self.state.game.as_mut() {
            game.phase = phase;
        }
        self.revision += 1;
        tracing::debug!(phase = phase.tag(), "undercover phase changed");
        self.observers.notify(&EngineEvent::PhaseChanged {
            game: GameKind::Undercover,
            phase: phase.tag(),
        });
    }
}

impl RoleGameEngine for UndercoverEngine {
    const KIND: GameKind = GameKind::Undercover;

    fn phase_tag(&self) -> &'static str {
        self.phase().tag()
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&EngineEvent)>) {
        self.observers.subscribe(listener);
    }

    fn play_again(&mut self) -> EngineResult<()> {
        let names = self
            .state
            .game
            .as_ref()
            .map(|g| g.session.names())
            .ok_or_else(|| EngineError::illegal("No game to replay"))?;
        self.state.game = None;
        self.launch(&names)
    }

    fn snapshot(&self) -> EngineResult<String> {
        Snapshot::capture(Self::KIND, self.revision, &self.state)?.encode()
    }

    fn restore(&mut self, encoded: &str) -> EngineResult<()> {
        let snapshot = Snapshot::decode(encoded)?;
        let revision = snapshot.revision;
        let state: UndercoverState = snapshot.into_state(Self::KIND)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        ["Ana", "Ben", "Cy", "Dee", "Eli", "Fay", "Gus"][..n]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn engine(seed: u64) -> UndercoverEngine {
        let mut e = UndercoverEngine::with_rng(StdRng::seed_from_u64(seed));
        let rules = UndercoverRules {
            word_pairs: vec![WordPair::new("Coffee", "Tea")],
            ..UndercoverRules::default()
        };
        e.set_rules(rules).unwrap();
        e
    }

    fn ids_of(e: &UndercoverEngine, role: UndercoverRole) -> Vec<ParticipantId> {
        e.game_state()
            .unwrap()
            .session()
            .participants()
            .iter()
            .filter(|p| p.role() == role)
            .map(|p| p.id())
            .collect()
    }

    fn walk_all(e: &mut UndercoverEngine) {
        while e.phase() == UndercoverPhase::RoleViewing {
            e.advance_viewer().unwrap();
        }
    }

    /// 6 players: 1 Mr. White, 1 spy, 4 agents.
    fn six_with_spy(seed: u64) -> UndercoverEngine {
        let mut e = engine(seed);
        e.set_total_players(6).unwrap();
        e.set_role_count(UndercoverRole::Spy, 1).unwrap();
        e.start_game(&names(6)).unwrap();
        walk_all(&mut e);
        e
    }

    #[test]
    fn guess_accepts_either_order_only_with_both_words() {
        let words = WordPair::new("Coffee", "Tea");
        assert!(guess_matches(&words, "Tea", "Coffee"));
        assert!(guess_matches(&words, " coffee ", "TEA"));
        assert!(!guess_matches(&words, "Coffee", "Coffee"));
        assert!(!guess_matches(&words, "Tea", "Milk"));
    }

    #[test]
    fn needs_an_impostor() {
        let mut e = engine(1);
        e.set_role_count(UndercoverRole::MrWhite, 0).unwrap();
        assert!(e.start_game(&names(4)).unwrap_err().is_validation());
        assert_eq!(e.phase(), UndercoverPhase::Setup);
    }

    #[test]
    fn agents_must_outnumber_impostors() {
        let mut e = engine(1);
        e.set_role_count(UndercoverRole::Spy, 1).unwrap();
        // 4 players: 1 white + 1 spy leaves 2 agents, not a majority
        assert!(e.start_game(&names(4)).unwrap_err().is_validation());
        e.set_total_players(5).unwrap();
        e.start_game(&names(5)).unwrap();
        assert_eq!(e.phase(), UndercoverPhase::RoleViewing);
    }

    #[test]
    fn agent_is_not_configurable() {
        let mut e = engine(1);
        assert!(e.set_role_count(UndercoverRole::Agent, 2).unwrap_err().is_validation());
    }

    #[test]
    fn word_holders_see_identical_cards() {
        let mut e = engine(2);
        e.set_total_players(6).unwrap();
        e.set_role_count(UndercoverRole::Spy, 1).unwrap();
        e.start_game(&names(6)).unwrap();
        let mut whites = 0;
        while e.phase() == UndercoverPhase::RoleViewing {
            let card = e.current_reveal().unwrap();
            let json = serde_json::to_value(&card).unwrap();
            match card.view {
                CardView::Word { label, ref word } => {
                    assert_eq!(label, AMBIGUOUS_LABEL);
                    assert!(word == "Coffee" || word == "Tea");
                }
                CardView::MrWhite { label } => {
                    assert_eq!(label, "Mr. White");
                    whites += 1;
                }
            }
            // the role itself never leaves the engine during the walk
            assert!(json.get("role").is_none());
            e.advance_viewer().unwrap();
        }
        assert_eq!(whites, 1);
        assert_eq!(e.phase(), UndercoverPhase::Discussion);
    }

    #[test]
    fn secrets_follow_roles() {
        let e = six_with_spy(3);
        for p in e.game_state().unwrap().session().participants() {
            let expected = match p.role() {
                UndercoverRole::Agent => Some("Coffee"),
                UndercoverRole::Spy => Some("Tea"),
                UndercoverRole::MrWhite => None,
            };
            assert_eq!(p.secret(), expected);
        }
    }

    #[test]
    fn first_speaker_is_alive() {
        let mut e = six_with_spy(4);
        let first = e.first_speaker().unwrap();
        assert!(first.alive);
        let agent = ids_of(&e, UndercoverRole::Agent)[0];
        e.eliminate(agent).unwrap();
        assert_eq!(e.round(), Some(2));
        assert!(e.first_speaker().unwrap().alive);
        assert_ne!(e.first_speaker().unwrap().id, agent);
    }

    #[test]
    fn mr_white_correct_guess_wins() {
        let mut e = six_with_spy(5);
        let white = ids_of(&e, UndercoverRole::MrWhite)[0];
        e.eliminate(white).unwrap();
        assert_eq!(e.phase(), UndercoverPhase::MrWhiteGuess);
        assert_eq!(e.guesser().unwrap().id, white);
        assert_eq!(e.submit_guess("Tea", "Coffee").unwrap(), GuessOutcome::Correct);
        let report = e.winner().unwrap();
        assert_eq!(report.winner, UndercoverWinner::MrWhite { id: white });
        assert_eq!(report.words, WordPair::new("Coffee", "Tea"));
    }

    #[test]
    fn mr_white_wrong_guess_resumes_play() {
        let mut e = six_with_spy(6);
        let white = ids_of(&e, UndercoverRole::MrWhite)[0];
        e.eliminate(white).unwrap();
        assert_eq!(e.submit_guess("Coffee", "Coffee").unwrap(), GuessOutcome::Wrong);
        // spy still alive, 1 v 4: play on
        assert_eq!(e.phase(), UndercoverPhase::Discussion);
        assert_eq!(e.round(), Some(2));
        assert!(e.submit_guess("Tea", "Coffee").unwrap_err().is_illegal_transition());
    }

    #[test]
    fn guess_outside_guess_phase_is_illegal() {
        let mut e = six_with_spy(7);
        assert!(e.submit_guess("Tea", "Coffee").unwrap_err().is_illegal_transition());
    }

    #[test]
    fn agents_win_when_impostors_are_out() {
        let mut e = engine(8);
        e.start_game(&names(4)).unwrap();
        walk_all(&mut e);
        let white = ids_of(&e, UndercoverRole::MrWhite)[0];
        e.eliminate(white).unwrap();
        e.submit_guess("Milk", "Juice").unwrap();
        assert_eq!(e.winner().unwrap().winner, UndercoverWinner::Agents);
        assert_eq!(e.overview().unwrap().len(), 4);
    }

    #[test]
    fn spies_win_at_parity_once_white_is_gone() {
        let mut e = six_with_spy(9);
        let agents = ids_of(&e, UndercoverRole::Agent);
        // 1 white, 1 spy, 4 agents → knock agents down to 2 first
        e.eliminate(agents[0]).unwrap();
        e.eliminate(agents[1]).unwrap();
        e.eliminate(agents[2]).unwrap();
        // 1 spy v 1 agent, but Mr. White is alive: no win yet
        assert_eq!(e.phase(), UndercoverPhase::Discussion);
        let white = ids_of(&e, UndercoverRole::MrWhite)[0];
        e.eliminate(white).unwrap();
        e.submit_guess("nope", "nada").unwrap();
        assert_eq!(e.winner().unwrap().winner, UndercoverWinner::Spies);
    }

    #[test]
    fn mr_white_outlasting_the_agents_wins() {
        // Stock table: 1 Mr. White, 3 agents.
        let mut e = engine(13);
        e.start_game(&names(4)).unwrap();
        walk_all(&mut e);
        let agents = ids_of(&e, UndercoverRole::Agent);
        let white = ids_of(&e, UndercoverRole::MrWhite)[0];
        e.eliminate(agents[0]).unwrap();
        e.eliminate(agents[1]).unwrap();
        assert_eq!(e.phase(), UndercoverPhase::Discussion);
        e.eliminate(agents[2]).unwrap();
        assert_eq!(e.phase(), UndercoverPhase::Winner);
        assert_eq!(e.winner().unwrap().winner, UndercoverWinner::MrWhite { id: white });
    }

    #[test]
    fn overview_hidden_until_the_end() {
        let e = six_with_spy(10);
        assert!(e.overview().unwrap_err().is_illegal_transition());
    }

    #[test]
    fn play_again_reshuffles_with_same_names() {
        let mut e = six_with_spy(11);
        let white = ids_of(&e, UndercoverRole::MrWhite)[0];
        e.eliminate(white).unwrap();
        e.submit_guess("Tea", "Coffee").unwrap();
        let old_code = e.game_state().unwrap().session().code().clone();

        e.play_again().unwrap();
        let game = e.game_state().unwrap();
        assert_eq!(e.phase(), UndercoverPhase::RoleViewing);
        assert_eq!(game.session().round(), 1);
        assert_eq!(game.session().names(), names(6));
        assert_ne!(game.session().code(), &old_code);
        assert!(e.seats().iter().all(|s| s.alive));
        assert!(e.winner().is_none());
        assert!(e.guesser().is_none());
    }

    #[test]
    fn snapshot_round_trips_mid_guess() {
        let mut e = six_with_spy(12);
        let white = ids_of(&e, UndercoverRole::MrWhite)[0];
        e.eliminate(white).unwrap();
        let encoded = e.snapshot().unwrap();

        let mut other = UndercoverEngine::with_rng(StdRng::seed_from_u64(0));
        other.restore(&encoded).unwrap();
        assert_eq!(other.phase(), UndercoverPhase::MrWhiteGuess);
        assert_eq!(other.game_state(), e.game_state());
        assert_eq!(other.submit_guess("coffee", "tea").unwrap(), GuessOutcome::Correct);
    }

    #[test]
    fn restore_rejects_bad_rules() {
        let mut e = engine(14);
        let mut snap = Snapshot::decode(&e.snapshot().unwrap()).unwrap();
        snap.state["rules"]["players"] = serde_json::json!({ "min": 9, "max": 4 });
        let err = e.restore(&snap.encode().unwrap()).unwrap_err();
        assert_eq!(err.kind(), "snapshot");
        assert_eq!(e.rules().players.min, 4);
        assert_eq!(e.set_total_players(6).unwrap(), 6);
    }
}
