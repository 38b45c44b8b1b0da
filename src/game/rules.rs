//! Per-game rule tables.
//!
//! Every limit the setup screens enforce lives here as plain serde data so a
//! host page can swap in a house-rules JSON blob before a game starts. Missing
//! fields fall back to the defaults of the stock games.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::content::{self, QuestionPool, WordPair};
use crate::game::mafia::MafiaRole;
use crate::game::undercover::UndercoverRole;

/// Inclusive count range used for clamping player and role counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u8,
    pub max: u8,
}

impl CountRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// Saturating clamp of any UI-supplied integer into the range. An
    /// inverted range lands on `max` instead of panicking.
    pub fn clamp(self, n: i32) -> u8 {
        n.max(i32::from(self.min)).min(i32::from(self.max)) as u8
    }

    pub fn contains(self, n: u8) -> bool {
        (self.min..=self.max).contains(&n)
    }

    pub(crate) fn check(self, what: &str) -> EngineResult<()> {
        if self.min > self.max {
            return Err(EngineError::validation(format!(
                "{what}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Range and starting count for one configurable role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule<R> {
    pub role: R,
    pub range: CountRange,
    pub default: u8,
}

impl<R> RoleRule<R> {
    pub const fn new(role: R, min: u8, max: u8, default: u8) -> Self {
        Self {
            role,
            range: CountRange::new(min, max),
            default,
        }
    }
}

fn check_role_rules<R: std::fmt::Debug>(roles: &[RoleRule<R>]) -> EngineResult<()> {
    for rule in roles {
        rule.range.check(&format!("{:?} count", rule.role))?;
        if !rule.range.contains(rule.default) {
            return Err(EngineError::validation(format!(
                "{:?} default {} outside {}..={}",
                rule.role, rule.default, rule.range.min, rule.range.max
            )));
        }
    }
    Ok(())
}

// ── Mafia ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MafiaRules {
    pub players: CountRange,
    pub default_players: u8,
    /// Civilian is never listed: it is always the remainder.
    pub roles: Vec<RoleRule<MafiaRole>>,
    /// How many participants the day vote may remove at once.
    pub max_day_eliminations: u8,
}

impl Default for MafiaRules {
    fn default() -> Self {
        Self {
            players: CountRange::new(5, 15),
            default_players: 5,
            roles: vec![
                RoleRule::new(MafiaRole::Doctor, 1, 1, 1),
                RoleRule::new(MafiaRole::Mafia, 1, 5, 1),
                RoleRule::new(MafiaRole::Detective, 0, 5, 0),
                RoleRule::new(MafiaRole::Jester, 0, 5, 0),
                RoleRule::new(MafiaRole::Bomber, 0, 5, 0),
                RoleRule::new(MafiaRole::Lover, 0, 1, 0),
            ],
            max_day_eliminations: 2,
        }
    }
}

impl MafiaRules {
    pub fn validate(&self) -> EngineResult<()> {
        self.players.check("player count")?;
        if self.roles.iter().any(|r| r.role == MafiaRole::Civilian) {
            return Err(EngineError::validation("Civilian count is derived, not configured"));
        }
        if self.roles.iter().any(|r| r.role == MafiaRole::Lover && r.range.max > 1) {
            return Err(EngineError::validation("At most one lover can hold the bond"));
        }
        if self.max_day_eliminations == 0 {
            return Err(EngineError::validation("Day vote must allow at least one elimination"));
        }
        check_role_rules(&self.roles)
    }
}

// ── Undercover ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndercoverRules {
    pub players: CountRange,
    pub default_players: u8,
    /// Agent is never listed: it is always the remainder.
    pub roles: Vec<RoleRule<UndercoverRole>>,
    pub word_pairs: Vec<WordPair>,
}

impl Default for UndercoverRules {
    fn default() -> Self {
        Self {
            players: CountRange::new(4, 15),
            default_players: 4,
            roles: vec![
                RoleRule::new(UndercoverRole::MrWhite, 0, 5, 1),
                RoleRule::new(UndercoverRole::Spy, 0, 5, 0),
            ],
            word_pairs: content::default_word_pairs(),
        }
    }
}

impl UndercoverRules {
    pub fn validate(&self) -> EngineResult<()> {
        self.players.check("player count")?;
        if self.roles.iter().any(|r| r.role == UndercoverRole::Agent) {
            return Err(EngineError::validation("Agent count is derived, not configured"));
        }
        if self.word_pairs.is_empty() {
            return Err(EngineError::validation("Word pool is empty"));
        }
        check_role_rules(&self.roles)
    }
}

// ── Odd One In ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OddOneInRules {
    pub min_players: u8,
    pub max_players: u8,
    /// Ticks each answering turn gets before a blank is submitted.
    pub countdown_ticks: u32,
    /// The game ends once this many (or fewer) participants remain.
    pub survivors_to_win: u8,
    pub questions: QuestionPool,
}

impl Default for OddOneInRules {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: 15,
            countdown_ticks: 10,
            survivors_to_win: 1,
            questions: content::default_questions(),
        }
    }
}

impl OddOneInRules {
    pub fn validate(&self) -> EngineResult<()> {
        CountRange::new(self.min_players, self.max_players).check("player count")?;
        if self.countdown_ticks == 0 {
            return Err(EngineError::validation("Countdown must be at least one tick"));
        }
        if !(1..=2).contains(&self.survivors_to_win) {
            return Err(EngineError::validation("Survivors to win must be 1 or 2"));
        }
        if usize::from(self.survivors_to_win) >= usize::from(self.min_players) {
            return Err(EngineError::validation("Minimum players must exceed survivors to win"));
        }
        self.questions.validate()
    }
}

/// Parse a rules blob, rejecting malformed JSON or inconsistent limits.
pub fn parse_rules<T>(json: &str, validate: impl Fn(&T) -> EngineResult<()>) -> EngineResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let rules: T = serde_json::from_str(json)
        .map_err(|e| EngineError::validation(format!("Invalid rules JSON: {e}")))?;
    validate(&rules)?;
    Ok(rules)
}
