use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::Phase;

/// One finished phase, either run to zero or cut short.
///
/// The idempotency key is assigned once when the record is created and sent
/// with every delivery attempt, so retries never produce a second record on
/// the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub idempotency_key: Uuid,
    pub phase: Phase,
    pub cycle_index: u32,
    pub planned_duration_seconds: u32,
    pub actual_duration_seconds: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub completed_normally: bool,
    pub preset_id: Option<String>,
}

impl SessionRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        phase: Phase,
        cycle_index: u32,
        planned_duration_seconds: u32,
        actual_duration_seconds: u32,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        completed_normally: bool,
        preset_id: Option<String>,
    ) -> Self {
        Self {
            idempotency_key: Uuid::new_v4(),
            phase,
            cycle_index,
            planned_duration_seconds,
            actual_duration_seconds: actual_duration_seconds.min(planned_duration_seconds),
            started_at,
            ended_at,
            completed_normally,
            preset_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_per_record() {
        let now = Utc::now();
        let a = SessionRecord::new(Phase::Work, 1, 1500, 1500, now, now, true, None);
        let b = SessionRecord::new(Phase::Work, 1, 1500, 1500, now, now, true, None);
        assert_ne!(a.idempotency_key, b.idempotency_key);
    }

    #[test]
    fn serializes_camel_case() {
        let now = Utc::now();
        let record = SessionRecord::new(Phase::ShortBreak, 2, 300, 120, now, now, false, Some("p1".into()));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["phase"], "shortBreak");
        assert_eq!(value["actualDurationSeconds"], 120);
        assert_eq!(value["completedNormally"], false);
        assert_eq!(value["presetId"], "p1");
        assert!(value["idempotencyKey"].is_string());
    }
}
