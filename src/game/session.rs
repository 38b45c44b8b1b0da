//! Session state shared by the role-reveal games (Mafia, Undercover).
//!
//! A session owns its participants and reveal walk outright. It is built once
//! per start and thrown away on "play again"; nothing is reused between
//! sessions.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::assign::{assign_roles, rotation_order};
use crate::game::ids::{ParticipantId, SessionCode};
use crate::game::reveal::RevealWalk;
use crate::game::roster::{self, Participant, Role, RosterEntry, Seat};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "R: Role")]
pub struct Session<R: Role> {
    code: SessionCode,
    round: u32,
    participants: Vec<Participant<R>>,
    walk: RevealWalk,
}

impl<R: Role> Session<R> {
    /// Assign roles to `names` and lay out a rotated reveal walk.
    pub fn start<G: Rng + ?Sized>(
        names: Vec<String>,
        roles: Vec<R>,
        rng: &mut G,
        secret_for: impl Fn(R) -> Option<String>,
    ) -> Self {
        let code = SessionCode::random(rng);
        let participants = assign_roles(names, roles, rng, secret_for);
        let walk = RevealWalk::new(rotation_order(participants.len(), rng));
        Self {
            code,
            round: 1,
            participants,
            walk,
        }
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub(crate) fn next_round(&mut self) -> u32 {
        self.round += 1;
        self.round
    }

    pub fn participants(&self) -> &[Participant<R>] {
        &self.participants
    }

    pub fn walk(&self) -> &RevealWalk {
        &self.walk
    }

    /// The participant currently holding the device during the walk.
    pub fn current_viewer(&self) -> Option<&Participant<R>> {
        self.walk.current().and_then(|i| self.participants.get(i))
    }

    pub fn next_viewer_name(&self) -> Option<&str> {
        self.walk
            .next_viewer()
            .and_then(|i| self.participants.get(i))
            .map(|p| p.name())
    }

    pub(crate) fn advance_viewer(&mut self) -> EngineResult<bool> {
        self.walk.advance()
    }

    pub fn participant(&self, id: ParticipantId) -> EngineResult<&Participant<R>> {
        roster::find(&self.participants, id)
            .ok_or_else(|| EngineError::validation(format!("Unknown participant {id}")))
    }

    /// Look up a participant that must still be in the game.
    pub fn living(&self, id: ParticipantId) -> EngineResult<&Participant<R>> {
        let p = self.participant(id)?;
        if !p.is_alive() {
            return Err(EngineError::validation(format!("{} is already out", p.name())));
        }
        Ok(p)
    }

    /// Mark a living participant as eliminated and return their seat.
    pub(crate) fn eliminate(&mut self, id: ParticipantId) -> EngineResult<Seat> {
        self.living(id)?;
        let p = roster::find_mut(&mut self.participants, id)
            .ok_or_else(|| EngineError::validation(format!("Unknown participant {id}")))?;
        p.eliminate();
        Ok(p.seat())
    }

    pub fn first_with_role(&self, role: R) -> Option<&Participant<R>> {
        self.participants.iter().find(|p| p.role() == role)
    }

    pub fn count_alive(&self, pred: impl Fn(R) -> bool) -> usize {
        roster::count_alive(&self.participants, pred)
    }

    pub fn seats(&self) -> Vec<Seat> {
        self.participants.iter().map(Participant::seat).collect()
    }

    pub fn living_seats(&self) -> Vec<Seat> {
        self.participants
            .iter()
            .filter(|p| p.is_alive())
            .map(Participant::seat)
            .collect()
    }

    /// Full role list. Engines gate this behind their overview/winner phases.
    pub fn roster(&self) -> Vec<RosterEntry<R>> {
        self.participants.iter().map(Participant::entry).collect()
    }

    /// Names in entry order, used to rebuild a fresh session on "play again".
    pub fn names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::undercover::UndercoverRole;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> Session<UndercoverRole> {
        let mut rng = StdRng::seed_from_u64(21);
        let names = ["Ana", "Ben", "Cy", "Dee"].map(String::from).to_vec();
        let roles = vec![
            UndercoverRole::MrWhite,
            UndercoverRole::Agent,
            UndercoverRole::Agent,
            UndercoverRole::Agent,
        ];
        Session::start(names, roles, &mut rng, |_| None)
    }

    #[test]
    fn fresh_session_starts_at_round_one_all_alive() {
        let s = session();
        assert_eq!(s.round(), 1);
        assert_eq!(s.count_alive(|_| true), 4);
        assert_eq!(s.walk().len(), 4);
        assert!(s.current_viewer().is_some());
    }

    #[test]
    fn eliminating_twice_is_rejected() {
        let mut s = session();
        let id = s.participants()[0].id();
        let seat = s.eliminate(id).unwrap();
        assert!(!seat.alive);
        assert!(s.eliminate(id).unwrap_err().is_validation());
    }

    #[test]
    fn unknown_id_is_validation_error() {
        let s = session();
        let stranger = ParticipantId::random(&mut StdRng::seed_from_u64(999));
        assert!(s.participant(stranger).unwrap_err().is_validation());
    }
}
