//! `/api/session/*` routes: snapshot export, restore and the broadcast outbox.
//!
//! The page writes exported snapshots to localStorage under
//! `sync::storage_key(game)` and relays outbox entries to other tabs; a
//! snapshot arriving from either place comes back in through `restore`.

use serde_json::json;

use crate::error::EngineError;
use crate::game::GameKind;
use crate::game::sync::{self, Snapshot};
use crate::routes::table;
use crate::routes::util::{fail, get_param, ok, parse_form_body, reply};

fn game_kind(slug: &str) -> Result<GameKind, EngineError> {
    GameKind::from_slug(slug).ok_or_else(|| EngineError::validation(format!("Unknown game: {slug}")))
}

/// GET /api/session/{game}/snapshot
pub fn handle_snapshot_get(game: &str) -> String {
    reply(game_kind(game).and_then(|kind| {
        let encoded = table::snapshot(kind)?;
        Ok(json!({ "key": sync::storage_key(kind), "snapshot": encoded }))
    }))
}

/// POST /api/session/{game}/restore
///
/// Body is either `snapshot={encoded}` or the bare encoded string.
pub fn handle_restore_post(game: &str, body: &str) -> String {
    let kind = match game_kind(game) {
        Ok(kind) => kind,
        Err(e) => return fail(&e),
    };
    let params = parse_form_body(body);
    let encoded = get_param(&params, "snapshot").unwrap_or(body);
    reply(table::restore(kind, encoded).map(|()| kind))
}

/// GET /api/session/outbox: drain snapshots queued since the last call.
/// Entries are tagged with their game so the page can file them.
pub fn handle_outbox_get(_query: &str) -> String {
    let entries: Vec<_> = table::drain_outbox()
        .into_iter()
        .filter_map(|encoded| {
            let game = Snapshot::decode(&encoded).ok()?.game;
            Some(json!({ "game": game, "key": sync::storage_key(game), "snapshot": encoded }))
        })
        .collect();
    ok(entries)
}
