//! Append-only record of one mission run

use crate::mission::MissionState;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of mission log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MissionStart,
    Command,
    /// A command the vehicle did not accept; it is resent next tick
    CommandError,
    Telemetry,
    ReadError,
    StepComplete,
    Fault,
    Timeout,
    Aborted,
    ConnectionFailed,
    MissionEnd,
}

/// One timestamped log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub event: EventKind,
    pub payload: Value,
}

/// Finalized, self-describing mission log document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLog {
    pub mission_name: String,
    pub start_time: u64,
    pub end_time: u64,
    pub final_state: MissionState,
    pub records: Vec<LogRecord>,
}

impl SerializedLog {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of records of a given kind
    pub fn count(&self, event: EventKind) -> usize {
        self.records.iter().filter(|r| r.event == event).count()
    }
}

/// Mission log that accepts records until it is finalized
#[derive(Debug, Clone)]
pub struct MissionLog {
    mission_name: String,
    start_time: u64,
    records: Vec<LogRecord>,
    finalized: Option<SerializedLog>,
}

impl MissionLog {
    pub fn new(mission_name: &str, start_time: u64) -> Self {
        Self {
            mission_name: mission_name.to_string(),
            start_time,
            records: Vec::new(),
            finalized: None,
        }
    }

    /// Append a record. Timestamps never go backwards: an earlier timestamp is
    /// raised to the last recorded one. Records after finalization are dropped.
    pub fn record(&mut self, timestamp: u64, event: EventKind, payload: Value) {
        if self.finalized.is_some() {
            warn!("Ignoring {:?} record: mission log already finalized", event);
            return;
        }
        let floor = self
            .records
            .last()
            .map_or(self.start_time, |r| r.timestamp);
        self.records.push(LogRecord {
            timestamp: timestamp.max(floor),
            event,
            payload,
        });
    }

    /// Seal the log. Later calls return the first result unchanged.
    pub fn finalize(&mut self, end_time: u64, final_state: MissionState) -> SerializedLog {
        if let Some(done) = &self.finalized {
            return done.clone();
        }
        let floor = self
            .records
            .last()
            .map_or(self.start_time, |r| r.timestamp);
        let serialized = SerializedLog {
            mission_name: self.mission_name.clone(),
            start_time: self.start_time,
            end_time: end_time.max(floor),
            final_state,
            records: std::mem::take(&mut self.records),
        };
        self.finalized = Some(serialized.clone());
        serialized
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    pub fn records(&self) -> &[LogRecord] {
        match &self.finalized {
            Some(done) => &done.records,
            None => &self.records,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_keep_monotonic_order() {
        let mut log = MissionLog::new("test", 1_000);
        log.record(1_500, EventKind::MissionStart, json!({}));
        log.record(1_200, EventKind::Telemetry, json!({"tick": 1}));
        log.record(2_000, EventKind::Telemetry, json!({"tick": 2}));

        let timestamps: Vec<u64> = log.records().iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![1_500, 1_500, 2_000]);
    }

    #[test]
    fn test_finalize_twice_is_stable() {
        let mut log = MissionLog::new("test", 1_000);
        log.record(1_100, EventKind::MissionStart, json!({}));
        log.record(1_200, EventKind::Telemetry, json!({"tick": 1}));

        let first = log.finalize(1_300, MissionState::Succeeded);
        log.record(1_400, EventKind::Telemetry, json!({"tick": 2}));
        let second = log.finalize(9_999, MissionState::Failed);

        assert_eq!(first, second);
        assert_eq!(second.records.len(), 2);
        assert_eq!(second.end_time, 1_300);
        assert_eq!(second.final_state, MissionState::Succeeded);
        assert!(log.is_finalized());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_serialized_document_fields() {
        let mut log = MissionLog::new("Direct Approach", 10);
        log.record(20, EventKind::MissionStart, json!({"target": [1, 2]}));
        let serialized = log.finalize(30, MissionState::TimedOut);

        let value: Value = serde_json::from_str(&serialized.to_json().unwrap()).unwrap();
        assert_eq!(value["start_time"], 10);
        assert_eq!(value["end_time"], 30);
        assert_eq!(value["final_state"], "timed_out");
        assert_eq!(value["records"][0]["event"], "mission_start");
        assert_eq!(value["records"][0]["timestamp"], 20);

        let parsed = SerializedLog::from_json(&serialized.to_json().unwrap()).unwrap();
        assert_eq!(parsed, serialized);
    }
}
