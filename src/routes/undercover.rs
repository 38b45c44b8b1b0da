//! `/api/undercover/*` routes.

use serde_json::{Value, json};

use crate::game::RoleGameEngine;
use crate::game::rules::{UndercoverRules, parse_rules};
use crate::game::undercover::{UndercoverEngine, UndercoverRole};
use crate::routes::table::{read_undercover, write_undercover};
use crate::routes::util::{
    get_param, names_param, parse_form_body, parse_role, require_i32, require_id, require_param,
};

fn state_view(e: &UndercoverEngine) -> Value {
    json!({
        "phase": e.phase().tag(),
        "round": e.round(),
        "total_players": e.config().total_players(),
        "distribution": e.config().distribution(),
        "seats": e.seats(),
        "first_speaker": e.first_speaker().ok(),
        "guesser": e.guesser(),
        "winner": e.winner().map(|w| w.winner),
    })
}

pub fn handle_state_get(_query: &str) -> String {
    read_undercover(|e| Ok(state_view(e)))
}

pub fn handle_rules_get(_query: &str) -> String {
    read_undercover(|e| Ok(e.rules().clone()))
}

pub fn handle_rules_post(body: &str) -> String {
    write_undercover(|e| {
        let rules = parse_rules(body, UndercoverRules::validate)?;
        e.set_rules(rules)?;
        Ok(state_view(e))
    })
}

/// Body params: total={n} and/or role={mr_white|spy}&count={n}
pub fn handle_config_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_undercover(|e| {
        if get_param(&params, "total").is_some() {
            e.set_total_players(require_i32(&params, "total")?)?;
        }
        if let Some(role) = get_param(&params, "role") {
            let role: UndercoverRole = parse_role(role)?;
            e.set_role_count(role, require_i32(&params, "count")?)?;
        }
        Ok(state_view(e))
    })
}

pub fn handle_start_post(body: &str) -> String {
    let names = names_param(&parse_form_body(body));
    write_undercover(|e| {
        e.start_game(&names)?;
        Ok(state_view(e))
    })
}

pub fn handle_end_post(_body: &str) -> String {
    write_undercover(|e| {
        e.end_game();
        Ok(state_view(e))
    })
}

pub fn handle_reveal_get(_query: &str) -> String {
    read_undercover(|e| {
        Ok(json!({
            "card": e.current_reveal()?,
            "next": e.next_viewer_name()?,
        }))
    })
}

pub fn handle_reveal_next_post(_body: &str) -> String {
    write_undercover(|e| {
        e.advance_viewer()?;
        Ok(state_view(e))
    })
}

pub fn handle_overview_get(_query: &str) -> String {
    read_undercover(|e| e.overview())
}

pub fn handle_speaker_get(_query: &str) -> String {
    read_undercover(|e| e.first_speaker())
}

/// Body: id={id}
pub fn handle_eliminate_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_undercover(|e| {
        let removed = e.eliminate(require_id(&params, "id")?)?;
        Ok(json!({ "removed": removed, "state": state_view(e) }))
    })
}

/// Body: first={word}&second={word}
pub fn handle_guess_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_undercover(|e| {
        let outcome = e.submit_guess(
            require_param(&params, "first")?,
            require_param(&params, "second")?,
        )?;
        Ok(json!({ "outcome": outcome, "state": state_view(e) }))
    })
}

pub fn handle_winner_get(_query: &str) -> String {
    read_undercover(|e| Ok(e.winner()))
}

pub fn handle_play_again_post(_body: &str) -> String {
    write_undercover(|e| {
        e.play_again()?;
        Ok(state_view(e))
    })
}
