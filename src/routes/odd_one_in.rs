//! `/api/odd-one-in/*` routes: lobby, answering turns, countdown and judging.
//!
//! The page drives the countdown by posting to `/tick` once a second.

use serde_json::{Value, json};

use crate::error::EngineError;
use crate::game::RoleGameEngine;
use crate::game::odd_one_in::OddOneInEngine;
use crate::game::rules::{OddOneInRules, parse_rules};
use crate::routes::table::{read_odd_one_in, write_odd_one_in};
use crate::routes::util::{get_param, parse_form_body, require_id, require_param, require_u64};

fn state_view(e: &OddOneInEngine) -> Value {
    let room = e.room_state();
    json!({
        "phase": e.phase_tag(),
        "code": room.map(|r| r.code().as_str().to_string()),
        "round": room.map(|r| r.round()),
        "seats": e.seats(),
        "question": e.question().ok(),
        "turn": e.current_turn().ok(),
        "winner": e.winner(),
    })
}

pub fn handle_state_get(_query: &str) -> String {
    read_odd_one_in(|e| Ok(state_view(e)))
}

pub fn handle_rules_get(_query: &str) -> String {
    read_odd_one_in(|e| Ok(e.rules().clone()))
}

pub fn handle_rules_post(body: &str) -> String {
    write_odd_one_in(|e| {
        let rules = parse_rules(body, OddOneInRules::validate)?;
        e.set_rules(rules)?;
        Ok(state_view(e))
    })
}

// ── Lobby ──────────────────────────────────────────────────────────

/// Body: gm={name}
pub fn handle_room_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_odd_one_in(|e| {
        let gm = e.create_room(require_param(&params, "gm")?)?;
        Ok(json!({ "gm": gm, "state": state_view(e) }))
    })
}

pub fn handle_close_post(_body: &str) -> String {
    write_odd_one_in(|e| {
        e.close_room();
        Ok(state_view(e))
    })
}

/// Body: name={name} to join, or action=remove&id={id}
pub fn handle_players_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_odd_one_in(|e| {
        match get_param(&params, "action").unwrap_or("add") {
            "add" => {
                e.add_player(require_param(&params, "name")?)?;
            }
            "remove" => e.remove_player(require_id(&params, "id")?)?,
            other => return Err(EngineError::validation(format!("Unknown action: {other}"))),
        }
        Ok(state_view(e))
    })
}

pub fn handle_start_post(_body: &str) -> String {
    write_odd_one_in(|e| {
        e.start_game()?;
        Ok(state_view(e))
    })
}

// ── Question ───────────────────────────────────────────────────────

pub fn handle_question_get(_query: &str) -> String {
    read_odd_one_in(|e| e.question().map(str::to_string))
}

/// Body: action=skip, or action=edit&text={question}
pub fn handle_question_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_odd_one_in(|e| {
        match get_param(&params, "action").unwrap_or("") {
            "skip" => {
                e.skip_question()?;
            }
            "edit" => e.edit_question(require_param(&params, "text")?)?,
            other => return Err(EngineError::validation(format!("Unknown action: {other}"))),
        }
        Ok(state_view(e))
    })
}

// ── Turns ──────────────────────────────────────────────────────────

pub fn handle_turn_get(_query: &str) -> String {
    read_odd_one_in(|e| e.current_turn())
}

/// Body: turn={token}&text={answer}
pub fn handle_answer_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_odd_one_in(|e| {
        let turn = require_u64(&params, "turn")?;
        e.submit_answer(turn, get_param(&params, "text").unwrap_or(""))?;
        Ok(state_view(e))
    })
}

pub fn handle_tick_post(_body: &str) -> String {
    write_odd_one_in(|e| {
        let tick = e.tick()?;
        Ok(json!({ "tick": tick, "state": state_view(e) }))
    })
}

/// Body: action=pause|resume|reset
pub fn handle_timer_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_odd_one_in(|e| {
        match get_param(&params, "action").unwrap_or("") {
            "pause" => e.pause_timer()?,
            "resume" => e.resume_timer()?,
            "reset" => e.reset_timer()?,
            other => return Err(EngineError::validation(format!("Unknown action: {other}"))),
        }
        Ok(state_view(e))
    })
}

// ── Judging ────────────────────────────────────────────────────────

pub fn handle_answers_get(_query: &str) -> String {
    read_odd_one_in(|e| e.judged_answers())
}

/// Body: id={id}
pub fn handle_eliminate_post(body: &str) -> String {
    let params = parse_form_body(body);
    write_odd_one_in(|e| {
        let removed = e.eliminate(require_id(&params, "id")?)?;
        Ok(json!({ "removed": removed, "state": state_view(e) }))
    })
}

pub fn handle_next_round_post(_body: &str) -> String {
    write_odd_one_in(|e| {
        e.next_round()?;
        Ok(state_view(e))
    })
}

pub fn handle_winner_get(_query: &str) -> String {
    read_odd_one_in(|e| Ok(e.winner()))
}

pub fn handle_play_again_post(_body: &str) -> String {
    write_odd_one_in(|e| {
        e.play_again()?;
        Ok(state_view(e))
    })
}
