use crate::CapturedRecord;

/// Maximum number of records kept in the capture log.
pub const LOG_CAPACITY: usize = 50;

/// Returns the log with `record` prepended, or `None` when its URL is
/// already present. The result never exceeds [`LOG_CAPACITY`]; the oldest
/// entries are dropped first.
pub fn insert(log: &[CapturedRecord], record: CapturedRecord) -> Option<Vec<CapturedRecord>> {
    if contains_url(log, &record.url) {
        return None;
    }
    let mut next = Vec::with_capacity((log.len() + 1).min(LOG_CAPACITY));
    next.push(record);
    next.extend(log.iter().take(LOG_CAPACITY - 1).cloned());
    Some(next)
}

pub fn contains_url(log: &[CapturedRecord], url: &str) -> bool {
    log.iter().any(|existing| existing.url == url)
}

/// Repairs a log loaded from storage: drops repeated URLs (keeping the
/// newest) and truncates to capacity.
pub fn normalize(records: Vec<CapturedRecord>) -> Vec<CapturedRecord> {
    let mut kept: Vec<CapturedRecord> = Vec::with_capacity(records.len().min(LOG_CAPACITY));
    for record in records {
        if kept.len() == LOG_CAPACITY {
            break;
        }
        if !contains_url(&kept, &record.url) {
            kept.push(record);
        }
    }
    kept
}
