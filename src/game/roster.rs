//! Roster and role configuration shared by the role-based games.
//!
//! A `RoleConfig` tracks the table size and the count of every configurable
//! role; the remainder role (civilian / agent) is never configured directly
//! and always equals `total - Σ(other counts)`. Invalid configurations are a
//! blocked start, never silently repaired.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::ids::ParticipantId;
use crate::game::rules::{CountRange, RoleRule};

/// A game's closed set of roles.
pub trait Role: Copy + Eq + Ord + Hash + Debug + Serialize + DeserializeOwned + 'static {
    /// Role whose count is the remainder of the table.
    const REMAINDER: Self;

    /// Human-readable role name.
    fn label(self) -> &'static str;
}

/// A seated participant. Role and secret are fixed at start; only `alive` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant<R> {
    id: ParticipantId,
    name: String,
    role: R,
    alive: bool,
    secret: Option<String>,
}

impl<R: Copy> Participant<R> {
    pub(crate) fn new(id: ParticipantId, name: String, role: R, secret: Option<String>) -> Self {
        Self {
            id,
            name,
            role,
            alive: true,
            secret,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> R {
        self.role
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Returns false if the participant was already out.
    pub(crate) fn eliminate(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }

    pub fn seat(&self) -> Seat {
        Seat {
            id: self.id,
            name: self.name.clone(),
            alive: self.alive,
        }
    }

    pub fn entry(&self) -> RosterEntry<R> {
        RosterEntry {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
            alive: self.alive,
            secret: self.secret.clone(),
        }
    }
}

/// Public view of a participant: never carries role data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: ParticipantId,
    pub name: String,
    pub alive: bool,
}

/// Full view used by the moderator overview and the end-of-game reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry<R> {
    pub id: ParticipantId,
    pub name: String,
    pub role: R,
    pub alive: bool,
    pub secret: Option<String>,
}

pub(crate) fn find<R>(participants: &[Participant<R>], id: ParticipantId) -> Option<&Participant<R>> {
    participants.iter().find(|p| p.id == id)
}

pub(crate) fn find_mut<R>(
    participants: &mut [Participant<R>],
    id: ParticipantId,
) -> Option<&mut Participant<R>> {
    participants.iter_mut().find(|p| p.id == id)
}

pub(crate) fn count_alive<R: Copy>(participants: &[Participant<R>], pred: impl Fn(R) -> bool) -> usize {
    participants
        .iter()
        .filter(|p| p.alive && pred(p.role))
        .count()
}

/// Table size and per-role counts for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "R: Role")]
pub struct RoleConfig<R: Role> {
    total_players: u8,
    players: CountRange,
    counts: BTreeMap<R, u8>,
    limits: BTreeMap<R, CountRange>,
}

impl<R: Role> RoleConfig<R> {
    pub fn new(players: CountRange, default_players: u8, roles: &[RoleRule<R>]) -> Self {
        Self {
            total_players: players.clamp(i32::from(default_players)),
            players,
            counts: roles.iter().map(|r| (r.role, r.default)).collect(),
            limits: roles.iter().map(|r| (r.role, r.range)).collect(),
        }
    }

    pub fn total_players(&self) -> u8 {
        self.total_players
    }

    /// Saturating: out-of-range requests land on the nearest bound.
    pub fn set_total_players(&mut self, n: i32) -> u8 {
        self.total_players = self.players.clamp(n);
        self.total_players
    }

    pub fn role_count(&self, role: R) -> u8 {
        if role == R::REMAINDER {
            return self.remainder().max(0) as u8;
        }
        self.counts.get(&role).copied().unwrap_or(0)
    }

    /// Clamp `n` into the role's range and store it.
    pub fn set_role_count(&mut self, role: R, n: i32) -> EngineResult<u8> {
        if role == R::REMAINDER {
            return Err(EngineError::validation(format!(
                "{} count is derived from the player total",
                role.label()
            )));
        }
        let range = self
            .limits
            .get(&role)
            .copied()
            .ok_or_else(|| EngineError::validation(format!("{} is not configurable", role.label())))?;
        let clamped = range.clamp(n);
        self.counts.insert(role, clamped);
        Ok(clamped)
    }

    /// `total - Σ(configured counts)`; may be negative while the UI is mid-edit.
    pub fn remainder(&self) -> i32 {
        let configured: i32 = self.counts.values().map(|&c| i32::from(c)).sum();
        i32::from(self.total_players) - configured
    }

    /// Confirm a deserialized config still fits `players` and `roles`: same
    /// limits, and every stored count inside its range.
    pub fn check_against(&self, players: CountRange, roles: &[RoleRule<R>]) -> EngineResult<()> {
        let limits: BTreeMap<R, CountRange> = roles.iter().map(|r| (r.role, r.range)).collect();
        if self.players != players || self.limits != limits {
            return Err(EngineError::validation("Role limits do not match the rules"));
        }
        if !players.contains(self.total_players) {
            return Err(EngineError::validation(format!(
                "{} players is outside {}..={}",
                self.total_players, players.min, players.max
            )));
        }
        for (&role, &count) in &self.counts {
            let in_range = limits.get(&role).is_some_and(|r| r.contains(count));
            if !in_range {
                return Err(EngineError::validation(format!(
                    "{} count {count} is out of range",
                    role.label()
                )));
            }
        }
        Ok(())
    }

    pub fn check_startable(&self) -> EngineResult<()> {
        let remainder = self.remainder();
        if remainder < 1 {
            return Err(EngineError::validation(format!(
                "Need at least one {} (configured roles leave {remainder})",
                R::REMAINDER.label()
            )));
        }
        Ok(())
    }

    /// Every role token for the table, configured roles first, remainder last.
    pub fn role_multiset(&self) -> EngineResult<Vec<R>> {
        self.check_startable()?;
        let mut roles = Vec::with_capacity(usize::from(self.total_players));
        for (&role, &count) in &self.counts {
            roles.extend(std::iter::repeat_n(role, usize::from(count)));
        }
        roles.extend(std::iter::repeat_n(R::REMAINDER, self.remainder() as usize));
        Ok(roles)
    }

    /// Counts for every role including the remainder, for setup displays.
    pub fn distribution(&self) -> Vec<(R, i32)> {
        let mut out: Vec<(R, i32)> = self
            .counts
            .iter()
            .map(|(&role, &count)| (role, i32::from(count)))
            .collect();
        out.push((R::REMAINDER, self.remainder()));
        out
    }
}

/// Trim names and check count, emptiness and case-insensitive uniqueness.
pub fn validate_names(names: &[String], expected: usize) -> EngineResult<Vec<String>> {
    let trimmed: Vec<String> = names.iter().map(|n| n.trim().to_string()).collect();
    if trimmed.iter().any(|n| n.is_empty()) {
        return Err(EngineError::validation("Please enter all player names"));
    }
    if trimmed.len() != expected {
        return Err(EngineError::validation(format!(
            "Expected {expected} player names, got {}",
            trimmed.len()
        )));
    }
    let mut seen = HashSet::with_capacity(trimmed.len());
    for name in &trimmed {
        if !seen.insert(name.to_lowercase()) {
            return Err(EngineError::validation(format!(
                "Player names must be unique ({name} appears twice)"
            )));
        }
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::mafia::MafiaRole;
    use crate::game::rules::MafiaRules;

    fn mafia_config() -> RoleConfig<MafiaRole> {
        let rules = MafiaRules::default();
        RoleConfig::new(rules.players, rules.default_players, &rules.roles)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn remainder_tracks_every_change() {
        let mut cfg = mafia_config();
        // 5 players: doctor + mafia leaves 3 civilians
        assert_eq!(cfg.remainder(), 3);
        cfg.set_role_count(MafiaRole::Detective, 1).unwrap();
        cfg.set_role_count(MafiaRole::Jester, 1).unwrap();
        assert_eq!(cfg.remainder(), 1);
        cfg.set_total_players(8);
        assert_eq!(cfg.remainder(), 4);
        assert_eq!(cfg.role_count(MafiaRole::Civilian), 4);
    }

    #[test]
    fn config_checked_against_its_rules() {
        let rules = MafiaRules::default();
        let cfg = mafia_config();
        cfg.check_against(rules.players, &rules.roles).unwrap();
        assert!(cfg.check_against(CountRange::new(6, 15), &rules.roles).is_err());

        let mut tampered = cfg.clone();
        tampered.counts.insert(MafiaRole::Mafia, 9);
        assert!(tampered.check_against(rules.players, &rules.roles).is_err());

        let mut tampered = cfg;
        tampered.total_players = 40;
        assert!(tampered.check_against(rules.players, &rules.roles).is_err());
    }

    #[test]
    fn total_players_saturates() {
        let mut cfg = mafia_config();
        assert_eq!(cfg.set_total_players(2), 5);
        assert_eq!(cfg.set_total_players(99), 15);
    }

    #[test]
    fn role_count_clamps_to_rule_range() {
        let mut cfg = mafia_config();
        assert_eq!(cfg.set_role_count(MafiaRole::Mafia, 9).unwrap(), 5);
        assert_eq!(cfg.set_role_count(MafiaRole::Mafia, -1).unwrap(), 1);
        assert_eq!(cfg.set_role_count(MafiaRole::Lover, 3).unwrap(), 1);
        assert_eq!(cfg.set_role_count(MafiaRole::Doctor, 0).unwrap(), 1);
    }

    #[test]
    fn remainder_role_is_not_configurable() {
        let mut cfg = mafia_config();
        assert!(cfg.set_role_count(MafiaRole::Civilian, 2).unwrap_err().is_validation());
    }

    #[test]
    fn negative_remainder_blocks_start_without_repair() {
        let mut cfg = mafia_config();
        cfg.set_role_count(MafiaRole::Mafia, 4).unwrap();
        assert_eq!(cfg.remainder(), 0);
        assert!(cfg.check_startable().is_err());
        cfg.set_role_count(MafiaRole::Bomber, 2).unwrap();
        assert_eq!(cfg.remainder(), -2);
        // total is untouched: the config is blocked, not auto-corrected
        assert_eq!(cfg.total_players(), 5);
        assert!(cfg.role_multiset().is_err());
    }

    #[test]
    fn multiset_matches_configuration() {
        let mut cfg = mafia_config();
        cfg.set_total_players(9);
        cfg.set_role_count(MafiaRole::Mafia, 2).unwrap();
        cfg.set_role_count(MafiaRole::Bomber, 1).unwrap();
        let roles = cfg.role_multiset().unwrap();
        assert_eq!(roles.len(), 9);
        let count = |r| roles.iter().filter(|&&x| x == r).count();
        assert_eq!(count(MafiaRole::Doctor), 1);
        assert_eq!(count(MafiaRole::Mafia), 2);
        assert_eq!(count(MafiaRole::Bomber), 1);
        assert_eq!(count(MafiaRole::Civilian), 5);
    }

    #[test]
    fn names_trimmed_and_validated() {
        let ok = validate_names(&names(&[" Ana ", "Ben", "Cy"]), 3).unwrap();
        assert_eq!(ok, names(&["Ana", "Ben", "Cy"]));
    }

    #[test]
    fn names_reject_wrong_count() {
        assert!(validate_names(&names(&["Ana", "Ben"]), 3).is_err());
    }

    #[test]
    fn names_reject_blank() {
        assert!(validate_names(&names(&["Ana", "  ", "Cy"]), 3).is_err());
    }

    #[test]
    fn names_reject_case_insensitive_duplicates() {
        let err = validate_names(&names(&["Ana", "ANA", "Cy"]), 3).unwrap_err();
        assert!(err.to_string().contains("unique"));
    }
}
