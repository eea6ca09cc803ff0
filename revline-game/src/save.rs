//! Snapshot reconciliation: versioned migrations, fail-closed loading
//! and the base64 save-code interchange format.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;
use thiserror::Error;

use crate::state::{GameState, MIN_SUPPORTED_VERSION, SCHEMA_VERSION};

/// At most one persisted write per this window.
pub const SAVE_THROTTLE_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save code is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("save code is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("snapshot is not a state object")]
    InvalidShape,
    #[error("snapshot version {found} is below the minimum supported {min}")]
    StaleVersion { found: u32, min: u32 },
}

type Migration = fn(&mut Value);

/// Pure upgrade steps, one per historical schema version. Entry `(n, f)`
/// rewrites a version-`n` snapshot into version `n + 1` shape; the chain
/// is applied sequentially until [`SCHEMA_VERSION`] is reached.
pub const MIGRATIONS: &[(u32, Migration)] = &[(2, migrate_v2_to_v3)];

/// v2 kept a top-level `store_reset` flag and had no notion of
/// cumulative slot purchases.
fn migrate_v2_to_v3(snapshot: &mut Value) {
    let Some(map) = snapshot.as_object_mut() else {
        return;
    };
    if let Some(flag) = map.remove("store_reset") {
        let warnings = map
            .entry("warnings")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Some(warnings) = warnings.as_object_mut() {
            warnings.entry("store_reset").or_insert(flag);
        }
    }
    if !map.contains_key("slots_purchased") {
        let slots = map.get("garage_slots").cloned().unwrap_or(Value::from(0));
        map.insert("slots_purchased".to_string(), slots);
    }
    map.insert("version".to_string(), Value::from(3));
}

fn snapshot_version(snapshot: &Value) -> Option<u32> {
    snapshot
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// Validate and migrate a parsed snapshot into the current state shape.
/// Fields introduced after the snapshot's version come back as their
/// defaults via `#[serde(default)]`.
///
/// # Errors
///
/// Returns an error when the snapshot is not an object, its version is
/// below [`MIN_SUPPORTED_VERSION`], or it does not deserialize after
/// migration.
pub fn state_from_snapshot(mut snapshot: Value) -> Result<GameState, SaveError> {
    if !snapshot.is_object() {
        return Err(SaveError::InvalidShape);
    }
    let found = snapshot_version(&snapshot).unwrap_or(0);
    if found < MIN_SUPPORTED_VERSION {
        return Err(SaveError::StaleVersion {
            found,
            min: MIN_SUPPORTED_VERSION,
        });
    }

    for (from, migration) in MIGRATIONS {
        if snapshot_version(&snapshot).unwrap_or(0) == *from {
            migration(&mut snapshot);
        }
    }

    let mut state: GameState = serde_json::from_value(snapshot)?;
    state.version = SCHEMA_VERSION;
    Ok(state)
}

/// Load a persisted snapshot, failing closed: any unusable input yields
/// the default initial state with the one-time reset warning set.
#[must_use]
pub fn load_state(raw: &str) -> GameState {
    let reset = |reason: &str| {
        log::warn!("persisted state discarded ({reason}); starting fresh");
        let mut state = GameState::default();
        state.warnings.store_reset = true;
        state
    };

    let snapshot: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => return reset(&format!("parse failure: {err}")),
    };
    match state_from_snapshot(snapshot) {
        Ok(state) => state,
        Err(err) => reset(&err.to_string()),
    }
}

/// Serialize the full state for the storage backend.
///
/// # Errors
///
/// Returns an error when the state cannot be serialized.
pub fn serialize_state(state: &GameState) -> Result<String, SaveError> {
    Ok(serde_json::to_string(state)?)
}

/// Wrap the current state in the base64 interchange format.
///
/// # Errors
///
/// Returns an error when the state cannot be serialized.
pub fn export_code(state: &GameState) -> Result<String, SaveError> {
    Ok(STANDARD.encode(serialize_state(state)?))
}

/// Decode a base64 save code into a migrated state. Decode, UTF-8 and
/// parse failures surface as distinct errors; the caller's state is
/// untouched either way.
///
/// # Errors
///
/// Returns an error when the code is not base64, not UTF-8, not JSON,
/// or not an acceptable snapshot.
pub fn import_code(code: &str) -> Result<GameState, SaveError> {
    let bytes = STANDARD.decode(code.trim())?;
    let json = String::from_utf8(bytes)?;
    let snapshot: Value = serde_json::from_str(&json)?;
    state_from_snapshot(snapshot)
}

fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Deep-merge a partial overlay over the default initial state. Used by
/// the development-only force-state command and test fixtures. Returns
/// `None` (state unchanged at the caller) when the merged document does
/// not deserialize.
#[must_use]
pub fn overlay_default_state(overlay: &Value) -> Option<GameState> {
    let mut base = serde_json::to_value(GameState::default()).ok()?;
    deep_merge(&mut base, overlay);
    serde_json::from_value(base).ok()
}
