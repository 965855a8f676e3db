use std::collections::HashSet;

/// URLs admitted during the current engine lifetime.
///
/// Never persisted: a restarted engine starts with an empty index even when
/// the restored log already holds records from a previous run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DedupIndex {
    urls: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn mark_seen(&mut self, url: impl Into<String>) {
        self.urls.insert(url.into());
    }

    pub fn clear(&mut self) {
        self.urls.clear();
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
