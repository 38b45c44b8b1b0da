//! Role assignment and reveal ordering.
//!
//! Only role labels are shuffled; names keep their entry order, so zipping a
//! uniformly permuted multiset against them yields a uniform bijection.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::game::ids::ParticipantId;
use crate::game::roster::{Participant, Role};

/// Shuffle `roles` and pair them with `names` in entry order.
///
/// `secret_for` attaches the role's payload (e.g. an Undercover word). Callers
/// guarantee `names.len() == roles.len()`.
pub fn assign_roles<R, G>(
    names: Vec<String>,
    mut roles: Vec<R>,
    rng: &mut G,
    secret_for: impl Fn(R) -> Option<String>,
) -> Vec<Participant<R>>
where
    R: Role,
    G: Rng + ?Sized,
{
    debug_assert_eq!(names.len(), roles.len());
    roles.shuffle(rng);
    names
        .into_iter()
        .zip(roles)
        .map(|(name, role)| Participant::new(ParticipantId::random(rng), name, role, secret_for(role)))
        .collect()
}

/// Seat indices starting from a random offset and wrapping around.
///
/// A rotation (not a full shuffle) keeps "pass to the person on your left"
/// prompts meaningful; every game uses this policy.
pub fn rotation_order<G: Rng + ?Sized>(len: usize, rng: &mut G) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let start = rng.gen_range(0..len);
    (0..len).map(|i| (start + i) % len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::mafia::MafiaRole;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seat_names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Player{i}")).collect()
    }

    fn roles_5() -> Vec<MafiaRole> {
        vec![
            MafiaRole::Doctor,
            MafiaRole::Mafia,
            MafiaRole::Civilian,
            MafiaRole::Civilian,
            MafiaRole::Civilian,
        ]
    }

    #[test]
    fn names_keep_entry_order_and_roles_form_a_bijection() {
        let mut rng = StdRng::seed_from_u64(11);
        let players = assign_roles(seat_names(5), roles_5(), &mut rng, |_| None);
        let got: Vec<&str> = players.iter().map(|p| p.name()).collect();
        assert_eq!(got, ["Player0", "Player1", "Player2", "Player3", "Player4"]);

        let mut assigned: Vec<MafiaRole> = players.iter().map(|p| p.role()).collect();
        let mut expected = roles_5();
        assigned.sort();
        expected.sort();
        assert_eq!(assigned, expected);
        assert!(players.iter().all(|p| p.is_alive()));
    }

    #[test]
    fn ids_are_unique() {
        let mut rng = StdRng::seed_from_u64(2);
        let players = assign_roles(seat_names(5), roles_5(), &mut rng, |_| None);
        let mut ids: Vec<_> = players.iter().map(|p| p.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn secret_follows_role() {
        let mut rng = StdRng::seed_from_u64(5);
        let players = assign_roles(seat_names(5), roles_5(), &mut rng, |r| {
            (r == MafiaRole::Mafia).then(|| "knife".to_string())
        });
        for p in &players {
            assert_eq!(p.secret().is_some(), p.role() == MafiaRole::Mafia);
        }
    }

    /// Chi-square goodness of fit: each seat should hold each role with
    /// frequency count/total. Three role kinds give 2 degrees of freedom per
    /// seat; 13.82 is the p = 0.001 critical value.
    #[test]
    fn assignment_is_uniform() {
        const TRIALS: usize = 20_000;
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let kinds = [MafiaRole::Doctor, MafiaRole::Mafia, MafiaRole::Civilian];
        let mut hits = [[0usize; 3]; 5];
        for _ in 0..TRIALS {
            let players = assign_roles(seat_names(5), roles_5(), &mut rng, |_| None);
            for (seat, p) in players.iter().enumerate() {
                let k = kinds.iter().position(|&r| r == p.role()).unwrap();
                hits[seat][k] += 1;
            }
        }
        let expected = [1.0 / 5.0, 1.0 / 5.0, 3.0 / 5.0].map(|f| f * TRIALS as f64);
        for seat in hits {
            let chi2: f64 = seat
                .iter()
                .zip(expected)
                .map(|(&obs, exp)| {
                    let d = obs as f64 - exp;
                    d * d / exp
                })
                .sum();
            assert!(chi2 < 13.82, "chi-square {chi2} too large for seat counts {seat:?}");
        }
    }

    #[test]
    fn rotation_visits_every_seat_once() {
        let mut rng = StdRng::seed_from_u64(9);
        let order = rotation_order(6, &mut rng);
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
        for pair in order.windows(2) {
            assert_eq!(pair[1], (pair[0] + 1) % 6);
        }
    }

    #[test]
    fn rotation_of_empty_table() {
        let mut rng = StdRng::seed_from_u64(9);
        assert!(rotation_order(0, &mut rng).is_empty());
    }
}
