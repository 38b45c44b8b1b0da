//! `/api/mafia/*` routes: setup, reveal walk, night, day and bomber screens.
//!
//! Every reply carries the engine's public state so the page can pick the
//! screen to render from `phase` alone.

use serde_json::{Value, json};

use crate::game::RoleGameEngine;
use crate::game::mafia::{MafiaEngine, MafiaRole};
use crate::game::rules::{MafiaRules, parse_rules};
use crate::routes::table::{read_mafia, write_mafia};
use crate::routes::util::{
    get_param, names_param, optional_id, parse_form_body, parse_role, require_i32, require_id,
};

/// Public state: never includes roles outside the overview/winner screens.
fn state_view(e: &MafiaEngine) -> Value {
    json!({
        "phase": e.phase().tag(),
        "round": e.round(),
        "total_players": e.config().total_players(),
        "distribution": e.config().distribution(),
        "seats": e.seats(),
        "vote_queue": e.vote_queue(),
        "last_night": e.last_night(),
        "pending_bomber": e.pending_bomber(),
        "winner": e.winner().map(|w| w.winner),
    })
}

// ── Setup ──────────────────────────────────────────────────────────

pub fn handle_state_get(_query: &str) -> String {
    read_mafia(|e| Ok(state_view(e)))
}

pub fn handle_rules_get(_query: &str) -> String {
    read_mafia(|e| Ok(e.rules().clone()))
}

/// Body is the rules JSON itself.
pub fn handle_rules_post(body: &str) -> String {
    write_mafia(|e| {
        let rules = parse_rules(body, MafiaRules::validate)?;
        e.set_rules(rules)?;
        Ok(state_view(e))
    })
}

/// Body params:
///   - total={n}               → set the table size (clamped)
///   - role={role}&count={n}   → set one role's count (clamped)
pub fn handle_config_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_mafia(|e| {
        if get_param(&params, "total").is_some() {
            e.set_total_players(require_i32(&params, "total")?)?;
        }
        if let Some(role) = get_param(&params, "role") {
            let role: MafiaRole = parse_role(role)?;
            e.set_role_count(role, require_i32(&params, "count")?)?;
        }
        Ok(state_view(e))
    })
}

pub fn handle_start_post(body: &str) -> String {
    let names = names_param(&parse_form_body(body));
    write_mafia(|e| {
        e.start_game(&names)?;
        Ok(state_view(e))
    })
}

pub fn handle_end_post(_body: &str) -> String {
    write_mafia(|e| {
        e.end_game();
        Ok(state_view(e))
    })
}

// ── Reveal walk ────────────────────────────────────────────────────

pub fn handle_reveal_get(_query: &str) -> String {
    read_mafia(|e| {
        Ok(json!({
            "card": e.current_reveal()?,
            "next": e.next_viewer_name()?,
        }))
    })
}

pub fn handle_reveal_next_post(_body: &str) -> String {
    write_mafia(|e| {
        e.advance_viewer()?;
        Ok(state_view(e))
    })
}

pub fn handle_overview_get(_query: &str) -> String {
    read_mafia(|e| e.overview())
}

// ── Night ──────────────────────────────────────────────────────────

pub fn handle_night_begin_post(_body: &str) -> String {
    write_mafia(|e| {
        e.begin_night()?;
        Ok(state_view(e))
    })
}

pub fn handle_night_script_get(_query: &str) -> String {
    read_mafia(|e| e.night_script())
}

/// Body: target={id}
pub fn handle_bond_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_mafia(|e| {
        e.bond_lover(require_id(&params, "target")?)?;
        Ok(state_view(e))
    })
}

/// Body: target={id} (empty clears)
pub fn handle_victim_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_mafia(|e| {
        e.record_victim(optional_id(&params, "target")?)?;
        Ok(state_view(e))
    })
}

/// Body: target={id} (empty clears)
pub fn handle_protect_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_mafia(|e| {
        e.record_protection(optional_id(&params, "target")?)?;
        Ok(state_view(e))
    })
}

pub fn handle_night_end_post(_body: &str) -> String {
    write_mafia(|e| {
        let outcome = e.end_night()?;
        Ok(json!({ "outcome": outcome, "state": state_view(e) }))
    })
}

// ── Day ────────────────────────────────────────────────────────────

pub fn handle_day_start_post(_body: &str) -> String {
    write_mafia(|e| {
        e.start_day()?;
        Ok(state_view(e))
    })
}

/// Body: id={id}; toggles that participant in the elimination queue.
pub fn handle_vote_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_mafia(|e| {
        let selected = e.toggle_vote(require_id(&params, "id")?)?;
        Ok(json!({ "selected": selected, "state": state_view(e) }))
    })
}

pub fn handle_confirm_post(_body: &str) -> String {
    write_mafia(|e| {
        let removed = e.confirm_eliminations()?;
        Ok(json!({ "removed": removed, "state": state_view(e) }))
    })
}

pub fn handle_skip_post(_body: &str) -> String {
    write_mafia(|e| {
        e.skip_elimination()?;
        Ok(state_view(e))
    })
}

/// Body: target={id}
pub fn handle_bomber_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_mafia(|e| {
        let removed = e.bomber_detonate(require_id(&params, "target")?)?;
        Ok(json!({ "removed": removed, "state": state_view(e) }))
    })
}

// ── End ────────────────────────────────────────────────────────────

pub fn handle_winner_get(_query: &str) -> String {
    read_mafia(|e| Ok(e.winner()))
}

pub fn handle_play_again_post(_body: &str) -> String {
    write_mafia(|e| {
        e.play_again()?;
        Ok(state_view(e))
    })
}
