//! The shared save document: load with legacy migration, guarded writes.

use crate::{PersistError, Store};
use idle_core::{validate_stamp, validate_state, GameState};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Key of the current save document.
pub const STATE_KEY: &str = "idle-clicker:state";

/// Keys used by earlier releases, checked in order when `STATE_KEY` is absent.
pub const LEGACY_STATE_KEYS: &[&str] = &["ray-clicker-game-state", "gameState"];

/// Where a loaded document came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadSource {
    /// Nothing stored; the initial state was used.
    Fresh,
    /// Read from `STATE_KEY`.
    Current,
    /// Read from a legacy key and moved to `STATE_KEY`.
    Migrated { from: &'static str },
    /// Stored document was unreadable; the initial state was used.
    Corrupted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadOutcome {
    pub state: GameState,
    pub source: LoadSource,
}

/// Result of a guarded write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// A strictly newer document was already stored; nothing was written.
    Stale { persisted: i64 },
}

fn parse_state(raw: &str) -> Result<GameState, String> {
    let state: GameState = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    validate_state(&state).map_err(|e| e.to_string())?;
    Ok(state)
}

/// Load the save document, migrating a legacy key on first sight.
///
/// Migration copies the legacy value to `STATE_KEY` before deleting the
/// legacy key, so an interrupted migration is simply repeated. An
/// unparsable document, or one stamped far ahead of `now_ms`, yields the
/// initial state with `LoadSource::Corrupted` and is removed so its stamp
/// cannot block later guarded writes.
pub async fn load_document<S: Store>(
    store: &S,
    now_ms: i64,
) -> Result<LoadOutcome, PersistError> {
    let (raw, source) = match store.get(STATE_KEY).await? {
        Some(raw) => (raw, LoadSource::Current),
        None => {
            let mut found = None;
            for legacy in LEGACY_STATE_KEYS {
                if let Some(raw) = store.get(legacy).await? {
                    store.set(STATE_KEY, raw.clone()).await?;
                    store.remove(legacy).await?;
                    info!(from = *legacy, to = STATE_KEY, "migrated legacy save");
                    found = Some((raw, LoadSource::Migrated { from: *legacy }));
                    break;
                }
            }
            match found {
                Some(hit) => hit,
                None => {
                    debug!("no save found, starting fresh");
                    return Ok(LoadOutcome {
                        state: GameState::default(),
                        source: LoadSource::Fresh,
                    });
                }
            }
        }
    };

    let parsed = parse_state(&raw).and_then(|state| {
        validate_stamp(state.last_update, now_ms)
            .map(|()| state)
            .map_err(|e| e.to_string())
    });
    match parsed {
        Ok(state) => Ok(LoadOutcome { state, source }),
        Err(reason) => {
            warn!(%reason, "save document corrupted, falling back to initial state");
            store.remove(STATE_KEY).await?;
            Ok(LoadOutcome {
                state: GameState::default(),
                source: LoadSource::Corrupted,
            })
        }
    }
}

/// Read the stored document without migrating. `None` when absent or
/// unreadable.
pub async fn read_document<S: Store>(store: &S) -> Result<Option<GameState>, PersistError> {
    let Some(raw) = store.get(STATE_KEY).await? else {
        return Ok(None);
    };
    match parse_state(&raw) {
        Ok(state) => Ok(Some(state)),
        Err(reason) => {
            warn!(%reason, "ignoring unreadable save document");
            Ok(None)
        }
    }
}

#[derive(Deserialize)]
struct Stamp {
    #[serde(rename = "lastUpdate", default)]
    last_update: i64,
}

/// `lastUpdate` of the stored document, if one is stored and readable.
pub async fn persisted_last_update<S: Store>(store: &S) -> Result<Option<i64>, PersistError> {
    let Some(raw) = store.get(STATE_KEY).await? else {
        return Ok(None);
    };
    Ok(serde_json::from_str::<Stamp>(&raw)
        .ok()
        .map(|s| s.last_update))
}

/// Write `state` unless the stored document is strictly newer.
///
/// This is optimistic: the check and the write are two store calls, and
/// equal stamps are not ordered.
pub async fn save_guarded<S: Store>(
    store: &S,
    state: &GameState,
) -> Result<WriteOutcome, PersistError> {
    if let Some(persisted) = persisted_last_update(store).await? {
        if persisted > state.last_update {
            debug!(
                persisted,
                outgoing = state.last_update,
                "dropping stale write"
            );
            return Ok(WriteOutcome::Stale { persisted });
        }
    }
    let raw = serde_json::to_string(state)?;
    store.set(STATE_KEY, raw).await?;
    Ok(WriteOutcome::Written)
}

/// Delete the save document and any legacy copies.
pub async fn clear_document<S: Store>(store: &S) -> Result<(), PersistError> {
    store.remove(STATE_KEY).await?;
    for legacy in LEGACY_STATE_KEYS {
        store.remove(legacy).await?;
    }
    Ok(())
}
