use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CapturedRecord, SessionKey, StreamKind};

/// Consistent view of the engine state after some completed commit.
///
/// This is also the unit written to the state store: `count` always equals
/// `log.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub enabled: bool,
    pub count: usize,
    pub log: Vec<CapturedRecord>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self::new(true, Vec::new())
    }
}

impl StateSnapshot {
    pub fn new(enabled: bool, log: Vec<CapturedRecord>) -> Self {
        Self {
            enabled,
            count: log.len(),
            log,
        }
    }

    /// Records of one session, newest first.
    pub fn records_for_session(&self, key: &SessionKey) -> Vec<&CapturedRecord> {
        self.log
            .iter()
            .filter(|record| &record.session_key == key)
            .collect()
    }

    pub fn find(&self, url: &str) -> Option<&CapturedRecord> {
        self.log.iter().find(|record| record.url == url)
    }

    /// Groups the log by session key, most recently active session first.
    pub fn sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = Vec::new();
        for record in &self.log {
            let index = match summaries
                .iter()
                .position(|summary| summary.session_key == record.session_key)
            {
                Some(index) => index,
                None => {
                    summaries.push(SessionSummary {
                        session_key: record.session_key.clone(),
                        title: record.source_title.clone(),
                        record_count: 0,
                        manifest_count: 0,
                        segment_count: 0,
                        latest: record.timestamp,
                    });
                    summaries.len() - 1
                }
            };
            let summary = &mut summaries[index];
            summary.record_count += 1;
            match record.kind {
                kind if kind.is_manifest() => summary.manifest_count += 1,
                StreamKind::Segment => summary.segment_count += 1,
                _ => {}
            }
            summary.latest = summary.latest.max(record.timestamp);
        }
        summaries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_key: SessionKey,
    pub title: String,
    pub record_count: usize,
    pub manifest_count: usize,
    pub segment_count: usize,
    pub latest: DateTime<Utc>,
}
