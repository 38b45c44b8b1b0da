//! Snapshot persistence and cross-tab broadcast.
//!
//! An engine's whole state is captured as a JSON `Snapshot`, then encoded as
//! URL-safe base64 so it can sit in localStorage or ride a storage event.
//!
//! Sync is last-write-wins: an incoming snapshot always replaces the whole
//! engine state, with no merge, lock or ordering check. Two tabs writing at
//! once can clobber each other; that is an accepted limitation of the
//! transport, not something the engine tries to resolve.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult, StoreError};
use crate::game::{GameKind, RoleGameEngine};

/// Stand-in for the browser's localStorage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
}

/// Delivery of encoded snapshots to other tabs/devices.
pub trait SnapshotChannel {
    fn publish(&mut self, encoded: &str);
}

/// Collects every published snapshot in order.
impl SnapshotChannel for Vec<String> {
    fn publish(&mut self, encoded: &str) {
        self.push(encoded.to_string());
    }
}

/// In-memory store with an optional per-value size quota.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes larger than `bytes`, like a full localStorage.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(StoreError::QuotaExceeded(key.to_string()));
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Storage key for a game's saved session.
pub fn storage_key(game: GameKind) -> String {
    format!("party-{}", game.slug())
}

/// Full engine state tagged with its game and a write counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game: GameKind,
    /// Informational only: the receiver applies whatever arrives last.
    pub revision: u64,
    pub state: serde_json::Value,
}

impl Snapshot {
    pub fn capture<T: Serialize>(game: GameKind, revision: u64, state: &T) -> EngineResult<Self> {
        let state = serde_json::to_value(state)
            .map_err(|e| EngineError::snapshot(format!("Cannot capture {game} state: {e}")))?;
        Ok(Self {
            game,
            revision,
            state,
        })
    }

    pub fn encode(&self) -> EngineResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| EngineError::snapshot(format!("Cannot encode snapshot: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(encoded: &str) -> EngineResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| EngineError::snapshot(format!("base64 decode error: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::snapshot(format!("Invalid snapshot JSON: {e}")))
    }

    /// Unwrap the state, refusing snapshots taken from a different game.
    pub fn into_state<T: DeserializeOwned>(self, expected: GameKind) -> EngineResult<T> {
        if self.game != expected {
            return Err(EngineError::snapshot(format!(
                "Snapshot belongs to {}, not {expected}",
                self.game
            )));
        }
        serde_json::from_value(self.state)
            .map_err(|e| EngineError::snapshot(format!("Snapshot does not fit {expected}: {e}")))
    }
}

/// Persist and/or publish an engine's snapshot. Both sinks are optional; a
/// failing store is logged and skipped. Returns the encoded snapshot.
pub fn broadcast<E: RoleGameEngine>(
    engine: &E,
    store: Option<&mut dyn KeyValueStore>,
    channel: Option<&mut dyn SnapshotChannel>,
) -> EngineResult<String> {
    let encoded = engine.snapshot()?;
    if let Some(store) = store {
        if let Err(e) = store.set(&storage_key(E::KIND), &encoded) {
            tracing::warn!(game = %E::KIND, error = %e, "snapshot not persisted");
        }
    }
    if let Some(channel) = channel {
        channel.publish(&encoded);
    }
    Ok(encoded)
}

/// Restore an engine from its saved snapshot. Returns false when nothing was saved.
pub fn load<E: RoleGameEngine>(engine: &mut E, store: &dyn KeyValueStore) -> EngineResult<bool> {
    match store.get(&storage_key(E::KIND)) {
        Some(encoded) => {
            engine.restore(&encoded)?;
            tracing::info!(game = %E::KIND, "session restored from storage");
            Ok(true)
        }
        None => Ok(false),
    }
}

pub fn clear(game: GameKind, store: &mut dyn KeyValueStore) {
    store.remove(&storage_key(game));
}
