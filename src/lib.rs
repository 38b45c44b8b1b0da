//! Party-game engine compiled to an in-browser WASM "server".
//!
//! Exports `handle_request(method, path, query, body)` for the page's worker
//! bridge to call. Uses `matchit` for URL routing, the same router engine
//! that powers Axum. Every route answers with JSON.
//!
//! The engines in `game` are plain values with no globals; `routes::table`
//! keeps one of each alive between calls.

use wasm_bindgen::prelude::*;

pub mod error;
pub mod game;
pub mod logging;
pub mod routes;

/// Install logging and the panic hook. Call once when the worker boots.
#[wasm_bindgen]
pub fn init() {
    logging::init_logging();
}

/// Process an HTTP-like request and return a JSON string.
///
/// # Arguments
/// * `method` : HTTP method ("GET" or "POST")
/// * `path`   : URL path (e.g., "/api/mafia/state")
/// * `query`  : Query string, with or without the leading `?`
/// * `body`   : Form-encoded POST body, or JSON for `/rules`. Empty for GET.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    use routes::{mafia, odd_one_in as odd, session, undercover, util};

    let mut router = matchit::Router::new();

    // Mafia
    router.insert("/api/mafia/state", "mafia_state").ok();
    router.insert("/api/mafia/rules", "mafia_rules").ok();
    router.insert("/api/mafia/config", "mafia_config").ok();
    router.insert("/api/mafia/start", "mafia_start").ok();
    router.insert("/api/mafia/end", "mafia_end").ok();
    router.insert("/api/mafia/reveal", "mafia_reveal").ok();
    router.insert("/api/mafia/reveal/next", "mafia_reveal_next").ok();
    router.insert("/api/mafia/overview", "mafia_overview").ok();
    router.insert("/api/mafia/night/begin", "mafia_night_begin").ok();
    router.insert("/api/mafia/night/script", "mafia_night_script").ok();
    router.insert("/api/mafia/night/bond", "mafia_bond").ok();
    router.insert("/api/mafia/night/victim", "mafia_victim").ok();
    router.insert("/api/mafia/night/protect", "mafia_protect").ok();
    router.insert("/api/mafia/night/end", "mafia_night_end").ok();
    router.insert("/api/mafia/day/start", "mafia_day_start").ok();
    router.insert("/api/mafia/day/vote", "mafia_vote").ok();
    router.insert("/api/mafia/day/confirm", "mafia_confirm").ok();
    router.insert("/api/mafia/day/skip", "mafia_skip").ok();
    router.insert("/api/mafia/bomber", "mafia_bomber").ok();
    router.insert("/api/mafia/winner", "mafia_winner").ok();
    router.insert("/api/mafia/play-again", "mafia_play_again").ok();

    // Undercover
    router.insert("/api/undercover/state", "uc_state").ok();
    router.insert("/api/undercover/rules", "uc_rules").ok();
    router.insert("/api/undercover/config", "uc_config").ok();
    router.insert("/api/undercover/start", "uc_start").ok();
    router.insert("/api/undercover/end", "uc_end").ok();
    router.insert("/api/undercover/reveal", "uc_reveal").ok();
    router.insert("/api/undercover/reveal/next", "uc_reveal_next").ok();
    router.insert("/api/undercover/overview", "uc_overview").ok();
    router.insert("/api/undercover/speaker", "uc_speaker").ok();
    router.insert("/api/undercover/eliminate", "uc_eliminate").ok();
    router.insert("/api/undercover/guess", "uc_guess").ok();
    router.insert("/api/undercover/winner", "uc_winner").ok();
    router.insert("/api/undercover/play-again", "uc_play_again").ok();

    // Odd One In
    router.insert("/api/odd-one-in/state", "odd_state").ok();
    router.insert("/api/odd-one-in/rules", "odd_rules").ok();
    router.insert("/api/odd-one-in/room", "odd_room").ok();
    router.insert("/api/odd-one-in/close", "odd_close").ok();
    router.insert("/api/odd-one-in/players", "odd_players").ok();
    router.insert("/api/odd-one-in/start", "odd_start").ok();
    router.insert("/api/odd-one-in/question", "odd_question").ok();
    router.insert("/api/odd-one-in/turn", "odd_turn").ok();
    router.insert("/api/odd-one-in/answer", "odd_answer").ok();
    router.insert("/api/odd-one-in/tick", "odd_tick").ok();
    router.insert("/api/odd-one-in/timer", "odd_timer").ok();
    router.insert("/api/odd-one-in/answers", "odd_answers").ok();
    router.insert("/api/odd-one-in/eliminate", "odd_eliminate").ok();
    router.insert("/api/odd-one-in/next-round", "odd_next_round").ok();
    router.insert("/api/odd-one-in/winner", "odd_winner").ok();
    router.insert("/api/odd-one-in/play-again", "odd_play_again").ok();

    // Persistence and cross-tab sync
    router.insert("/api/session/outbox", "session_outbox").ok();
    router.insert("/api/session/{game}/snapshot", "session_snapshot").ok();
    router.insert("/api/session/{game}/restore", "session_restore").ok();

    let matched = match router.at(path) {
        Ok(matched) => matched,
        Err(_) => {
            tracing::debug!(method, path, "no route");
            return util::not_found();
        }
    };
    let game = matched.params.get("game").unwrap_or("");

    match (*matched.value, method) {
        ("mafia_state", "GET") => mafia::handle_state_get(query),
        ("mafia_rules", "GET") => mafia::handle_rules_get(query),
        ("mafia_rules", "POST") => mafia::handle_rules_post(body),
        ("mafia_config", "POST") => mafia::handle_config_post(body),
        ("mafia_start", "POST") => mafia::handle_start_post(body),
        ("mafia_end", "POST") => mafia::handle_end_post(body),
        ("mafia_reveal", "GET") => mafia::handle_reveal_get(query),
        ("mafia_reveal_next", "POST") => mafia::handle_reveal_next_post(body),
        ("mafia_overview", "GET") => mafia::handle_overview_get(query),
        ("mafia_night_begin", "POST") => mafia::handle_night_begin_post(body),
        ("mafia_night_script", "GET") => mafia::handle_night_script_get(query),
        ("mafia_bond", "POST") => mafia::handle_bond_post(body),
        ("mafia_victim", "POST") => mafia::handle_victim_post(body),
        ("mafia_protect", "POST") => mafia::handle_protect_post(body),
        ("mafia_night_end", "POST") => mafia::handle_night_end_post(body),
        ("mafia_day_start", "POST") => mafia::handle_day_start_post(body),
        ("mafia_vote", "POST") => mafia::handle_vote_post(body),
        ("mafia_confirm", "POST") => mafia::handle_confirm_post(body),
        ("mafia_skip", "POST") => mafia::handle_skip_post(body),
        ("mafia_bomber", "POST") => mafia::handle_bomber_post(body),
        ("mafia_winner", "GET") => mafia::handle_winner_get(query),
        ("mafia_play_again", "POST") => mafia::handle_play_again_post(body),

        ("uc_state", "GET") => undercover::handle_state_get(query),
        ("uc_rules", "GET") => undercover::handle_rules_get(query),
        ("uc_rules", "POST") => undercover::handle_rules_post(body),
        ("uc_config", "POST") => undercover::handle_config_post(body),
        ("uc_start", "POST") => undercover::handle_start_post(body),
        ("uc_end", "POST") => undercover::handle_end_post(body),
        ("uc_reveal", "GET") => undercover::handle_reveal_get(query),
        ("uc_reveal_next", "POST") => undercover::handle_reveal_next_post(body),
        ("uc_overview", "GET") => undercover::handle_overview_get(query),
        ("uc_speaker", "GET") => undercover::handle_speaker_get(query),
        ("uc_eliminate", "POST") => undercover::handle_eliminate_post(body),
        ("uc_guess", "POST") => undercover::handle_guess_post(body),
        ("uc_winner", "GET") => undercover::handle_winner_get(query),
        ("uc_play_again", "POST") => undercover::handle_play_again_post(body),

        ("odd_state", "GET") => odd::handle_state_get(query),
        ("odd_rules", "GET") => odd::handle_rules_get(query),
        ("odd_rules", "POST") => odd::handle_rules_post(body),
        ("odd_room", "POST") => odd::handle_room_post(body),
        ("odd_close", "POST") => odd::handle_close_post(body),
        ("odd_players", "POST") => odd::handle_players_post(body),
        ("odd_start", "POST") => odd::handle_start_post(body),
        ("odd_question", "GET") => odd::handle_question_get(query),
        ("odd_question", "POST") => odd::handle_question_post(body),
        ("odd_turn", "GET") => odd::handle_turn_get(query),
        ("odd_answer", "POST") => odd::handle_answer_post(body),
        ("odd_tick", "POST") => odd::handle_tick_post(body),
        ("odd_timer", "POST") => odd::handle_timer_post(body),
        ("odd_answers", "GET") => odd::handle_answers_get(query),
        ("odd_eliminate", "POST") => odd::handle_eliminate_post(body),
        ("odd_next_round", "POST") => odd::handle_next_round_post(body),
        ("odd_winner", "GET") => odd::handle_winner_get(query),
        ("odd_play_again", "POST") => odd::handle_play_again_post(body),

        ("session_outbox", "GET") => session::handle_outbox_get(query),
        ("session_snapshot", "GET") => session::handle_snapshot_get(game),
        ("session_restore", "POST") => session::handle_restore_post(game, body),

        _ => util::method_not_allowed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn call(method: &str, path: &str, body: &str) -> Value {
        let raw = handle_request(method, path, "", body);
        serde_json::from_str(&raw).unwrap()
    }

    fn seat_ids(state: &Value) -> Vec<String> {
        state["seats"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn returns_404_for_unknown_route() {
        let reply = call("GET", "/api/nonexistent", "");
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["status"], 404);
    }

    #[test]
    fn returns_405_for_wrong_method() {
        let reply = call("POST", "/api/mafia/state", "");
        assert_eq!(reply["status"], 405);
    }

    #[test]
    fn mafia_setup_through_the_bridge() {
        routes::table::reset();
        let reply = call("POST", "/api/mafia/config", "total=6&role=detective&count=1");
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["data"]["total_players"], 6);

        let reply = call("POST", "/api/mafia/start", "name=Ana&name=Ben");
        assert_eq!(reply["error"]["kind"], "validation");

        let names = "name=Ana&name=Ben&name=Cy&name=Dee&name=Eli&name=Fay";
        let reply = call("POST", "/api/mafia/start", names);
        assert_eq!(reply["data"]["phase"], "role_viewing");
        assert_eq!(seat_ids(&reply["data"]).len(), 6);

        let reveal = call("GET", "/api/mafia/reveal", "");
        assert!(reveal["data"]["card"]["label"].is_string());
        assert_eq!(call("GET", "/api/mafia/overview", "")["ok"], false);
        routes::table::reset();
    }

    #[test]
    fn mafia_confirm_without_votes_is_rejected() {
        routes::table::reset();
        call("POST", "/api/mafia/start", "names=A%0AB%0AC%0AD%0AE");
        for _ in 0..5 {
            call("POST", "/api/mafia/reveal/next", "");
        }
        assert_eq!(call("GET", "/api/mafia/state", "")["data"]["phase"], "overview");
        call("POST", "/api/mafia/night/begin", "");
        let end = call("POST", "/api/mafia/night/end", "");
        assert_eq!(end["data"]["outcome"]["outcome"], "quiet");
        call("POST", "/api/mafia/day/start", "");
        let reply = call("POST", "/api/mafia/day/confirm", "");
        assert_eq!(reply["error"]["kind"], "illegal_transition");
        routes::table::reset();
    }

    #[test]
    fn undercover_rules_from_json() {
        routes::table::reset();
        let rules = r#"{"word_pairs":[{"majority":"Coffee","minority":"Tea"}]}"#;
        assert_eq!(call("POST", "/api/undercover/rules", rules)["ok"], true);
        let reply = call("POST", "/api/undercover/rules", "{not json");
        assert_eq!(reply["error"]["kind"], "validation");

        call("POST", "/api/undercover/start", "names=A%0AB%0AC%0AD");
        let card = call("GET", "/api/undercover/reveal", "");
        let word = &card["data"]["card"]["word"];
        assert!(word.is_null() || word == "Coffee" || word == "Tea");
        routes::table::reset();
    }

    #[test]
    fn odd_one_in_round_through_the_bridge() {
        routes::table::reset();
        call("POST", "/api/odd-one-in/room", "gm=Gemma");
        for name in ["Ana", "Ben", "Cy"] {
            call("POST", "/api/odd-one-in/players", &format!("name={name}"));
        }
        let state = call("POST", "/api/odd-one-in/start", "");
        assert_eq!(state["data"]["phase"], "answering");

        let turn = call("GET", "/api/odd-one-in/turn", "")["data"]["turn"].as_u64().unwrap();
        let reply = call("POST", "/api/odd-one-in/answer", &format!("turn={turn}&text=zebra"));
        assert_eq!(reply["ok"], true);
        let stale = call("POST", "/api/odd-one-in/answer", &format!("turn={turn}&text=again"));
        assert_eq!(stale["error"]["kind"], "illegal_transition");

        for _ in 0..10 {
            call("POST", "/api/odd-one-in/tick", "");
        }
        let turn = call("GET", "/api/odd-one-in/turn", "")["data"]["turn"].as_u64().unwrap();
        call("POST", "/api/odd-one-in/answer", &format!("turn={turn}&text=apple"));

        let answers = call("GET", "/api/odd-one-in/answers", "");
        let texts: Vec<&str> = answers["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, ["", "apple", "zebra"]);
        routes::table::reset();
    }

    #[test]
    fn session_snapshot_restore_and_outbox() {
        routes::table::reset();
        call("POST", "/api/mafia/config", "total=8");
        let outbox = call("GET", "/api/session/outbox", "");
        assert_eq!(outbox["data"][0]["key"], "party-mafia");

        let snap = call("GET", "/api/session/mafia/snapshot", "");
        let encoded = snap["data"]["snapshot"].as_str().unwrap().to_string();
        routes::table::reset();
        assert_eq!(call("GET", "/api/mafia/state", "")["data"]["total_players"], 5);

        let reply = call("POST", "/api/session/mafia/restore", &encoded);
        assert_eq!(reply["ok"], true);
        assert_eq!(call("GET", "/api/mafia/state", "")["data"]["total_players"], 8);

        let wrong = call("POST", "/api/session/undercover/restore", &encoded);
        assert_eq!(wrong["error"]["kind"], "snapshot");
        assert_eq!(call("GET", "/api/session/poker/snapshot", "")["ok"], false);
        routes::table::reset();
    }
}
