//! Destinations for finalized mission logs

use crate::core::{NavResult, NavigationError};
use crate::mission::{MissionState, SerializedLog};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Persists a finalized mission log
pub trait LogSink {
    /// Store the log and return where it went
    fn persist(&mut self, log: &SerializedLog) -> NavResult<String>;
}

/// Writes one pretty-printed JSON document per mission into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// `mission_<start ms>_<success|failed>.json`
    pub fn file_name(log: &SerializedLog) -> String {
        let status = if log.final_state == MissionState::Succeeded {
            "success"
        } else {
            "failed"
        };
        format!("mission_{}_{}.json", log.start_time, status)
    }
}

impl LogSink for JsonFileSink {
    fn persist(&mut self, log: &SerializedLog) -> NavResult<String> {
        fs::create_dir_all(&self.dir).map_err(|e| NavigationError::Persist {
            message: format!("Failed to create log directory '{}': {}", self.dir.display(), e),
        })?;

        let content = log.to_json().map_err(|e| NavigationError::Persist {
            message: format!("Failed to serialize mission log: {}", e),
        })?;

        let path = self.dir.join(Self::file_name(log));
        fs::write(&path, content).map_err(|e| NavigationError::Persist {
            message: format!("Failed to write mission log '{}': {}", path.display(), e),
        })?;

        info!("Mission log saved to {}", path.display());
        Ok(path.to_string_lossy().to_string())
    }
}

/// Keeps logs in memory; clones share storage
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    logs: Arc<Mutex<Vec<SerializedLog>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<SerializedLog> {
        self.logs.lock().map(|logs| logs.clone()).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn persist(&mut self, log: &SerializedLog) -> NavResult<String> {
        let mut logs = self.logs.lock().map_err(|_| NavigationError::Persist {
            message: "memory sink lock poisoned".to_string(),
        })?;
        logs.push(log.clone());
        Ok(format!("memory:{}", logs.len() - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{EventKind, MissionLog};
    use serde_json::json;

    fn sample_log(state: MissionState) -> SerializedLog {
        let mut log = MissionLog::new("Three-Stage Approach", 1_723_111_200_000);
        log.record(1_723_111_200_001, EventKind::MissionStart, json!({}));
        log.finalize(1_723_111_200_500, state)
    }

    #[test]
    fn test_file_name_reflects_outcome() {
        assert_eq!(
            JsonFileSink::file_name(&sample_log(MissionState::Succeeded)),
            "mission_1723111200000_success.json"
        );
        assert_eq!(
            JsonFileSink::file_name(&sample_log(MissionState::TimedOut)),
            "mission_1723111200000_failed.json"
        );
    }

    #[test]
    fn test_json_file_sink_writes_document() {
        let dir = std::env::temp_dir().join(format!("docking_nav_sink_{}", std::process::id()));
        let mut sink = JsonFileSink::new(&dir);
        let log = sample_log(MissionState::Failed);

        let location = sink.persist(&log).unwrap();
        let content = fs::read_to_string(&location).unwrap();
        assert_eq!(SerializedLog::from_json(&content).unwrap(), log);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_memory_sink_shares_storage() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.persist(&sample_log(MissionState::Succeeded)).unwrap();
        assert_eq!(sink.logs().len(), 1);
    }
}
