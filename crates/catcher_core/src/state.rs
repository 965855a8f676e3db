use crate::bounded_log;
use crate::view_model::StateSnapshot;
use crate::{CapturedRecord, DedupIndex};

/// State owned by the engine's single writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    pub(crate) enabled: bool,
    pub(crate) log: Vec<CapturedRecord>,
    pub(crate) dedup: DedupIndex,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            enabled: true,
            log: Vec::new(),
            dedup: DedupIndex::new(),
        }
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds state from a persisted snapshot. The dedup index starts empty.
    pub fn restore(snapshot: StateSnapshot) -> Self {
        Self {
            enabled: snapshot.enabled,
            log: bounded_log::normalize(snapshot.log),
            dedup: DedupIndex::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&self) -> &[CapturedRecord] {
        &self.log
    }

    pub fn dedup(&self) -> &DedupIndex {
        &self.dedup
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::new(self.enabled, self.log.clone())
    }
}
