//! Durable JSON persistence
//!
//! State and history are written with the write-to-tmp-then-rename pattern
//! so a crash mid-write never truncates the previous good file.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::history::EventLog;
use crate::registry::BotRegistry;

/// Everything the engine persists between restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub registry: BotRegistry,
    pub history: EventLog,
}

/// Atomically serialize `value` as pretty JSON at `path`.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a JSON file if it exists; `None` for a missing file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&data)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::BotEvent;
    use crate::config::StrategyConfig;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vortex-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let loaded: Option<PersistedState> = load_json(&scratch_path("missing")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_state_round_trip() {
        let mut registry = BotRegistry::new(10_000.0);
        registry
            .create("BTC-USDT", StrategyConfig::default(), 50_000.0)
            .unwrap();
        let mut history = EventLog::new();
        history.append("BTC-USDT", &BotEvent::BotStarted { price: 50_000.0 });

        let path = scratch_path("roundtrip");
        save_json(&path, &PersistedState { registry, history }).unwrap();

        let loaded: PersistedState = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded.registry.bots().len(), 1);
        assert_eq!(loaded.registry.bots()[0].symbol, "BTC-USDT");
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history.entries()[0].event, "Bot Started");

        std::fs::remove_file(&path).ok();
    }
}
