//! Atomic whole-file snapshots of open orders and recent trades.
//!
//! The snapshot is a single `state.json` under the configured directory,
//! replaced atomically by writing `state.json.tmp` and renaming it over the
//! committed name. A crash mid-write leaves either the old committed file or
//! a tmp sibling the loader never reads. All decimal fields are stored as
//! decimal string literals, so a save/load round trip is bit-identical.

use crate::engine::error::EngineError;
use crate::engine::types::{Order, Trade};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::trace;

/// File name of the committed snapshot.
const STATE_FILE: &str = "state.json";

/// Sibling written first, then renamed over [`STATE_FILE`].
const STATE_TMP_FILE: &str = "state.json.tmp";

/// The on-disk snapshot shape: open orders and recent trades per symbol.
///
/// "Open" covers resting limit orders and pending trigger orders alike; the
/// loader routes each to the right container. Unknown optional fields
/// decode as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    /// Per symbol, every order that should survive a restart.
    #[serde(default)]
    pub open_orders: BTreeMap<String, Vec<Order>>,
    /// Per symbol, the recent-trade ring in print order.
    #[serde(default)]
    pub recent_trades: BTreeMap<String, Vec<Trade>>,
}

/// Read the committed snapshot from `dir`.
///
/// A missing file yields the empty default state. A file that cannot be
/// read or decoded is an error; callers decide whether to refuse startup or
/// begin empty (the engine logs and begins empty).
///
/// # Errors
///
/// [`EngineError::Persistence`] on I/O failure,
/// [`EngineError::Serialization`] on a corrupt snapshot.
pub async fn load_state(dir: &Path) -> Result<PersistedState, EngineError> {
    let path = dir.join(STATE_FILE);
    let contents = tokio::task::spawn_blocking(move || std::fs::read_to_string(&path))
        .await
        .map_err(|error| EngineError::Persistence {
            message: error.to_string(),
        })?;
    let contents = match contents {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(PersistedState::default());
        }
        Err(error) => {
            return Err(EngineError::Persistence {
                message: error.to_string(),
            });
        }
    };
    serde_json::from_str(&contents).map_err(|error| EngineError::Serialization {
        message: error.to_string(),
    })
}

/// Atomically write the snapshot under `dir`, creating the directory when
/// absent.
///
/// # Errors
///
/// [`EngineError::Serialization`] when the state cannot be encoded,
/// [`EngineError::Persistence`] on I/O failure.
pub async fn save_state(dir: &Path, state: &PersistedState) -> Result<(), EngineError> {
    let payload = serde_json::to_string(state).map_err(|error| EngineError::Serialization {
        message: error.to_string(),
    })?;
    let dir = dir.to_path_buf();
    trace!(path = %dir.display(), bytes = payload.len(), "writing state snapshot");
    tokio::task::spawn_blocking(move || -> io::Result<()> {
        std::fs::create_dir_all(&dir)?;
        let tmp = dir.join(STATE_TMP_FILE);
        std::fs::write(&tmp, payload.as_bytes())?;
        std::fs::rename(&tmp, dir.join(STATE_FILE))
    })
    .await
    .map_err(|error| EngineError::Persistence {
        message: error.to_string(),
    })?
    .map_err(|error| EngineError::Persistence {
        message: error.to_string(),
    })
}
