use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SessionKey, StreamKind};

/// Placeholder for a missing initiator page.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One observed network request, as delivered by the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub url: String,
    pub initiator_page: Option<String>,
    pub observed_at: DateTime<Utc>,
    /// Page title, when the event source knows it.
    pub title_hint: Option<String>,
    /// Explicit session identifier; takes precedence over the initiator page.
    pub session_hint: Option<String>,
}

impl CaptureEvent {
    pub fn new(url: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            initiator_page: None,
            observed_at,
            title_hint: None,
            session_hint: None,
        }
    }

    pub fn with_initiator(mut self, page: impl Into<String>) -> Self {
        self.initiator_page = Some(page.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title_hint = Some(title.into());
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session_hint = Some(session.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRecord {
    pub url: String,
    pub source_page: String,
    pub source_title: String,
    pub session_key: SessionKey,
    pub timestamp: DateTime<Utc>,
    pub kind: StreamKind,
}

impl CapturedRecord {
    pub(crate) fn from_event(event: CaptureEvent, kind: StreamKind, session_key: SessionKey) -> Self {
        let source_page = non_blank(event.initiator_page.as_deref())
            .unwrap_or(UNKNOWN_SOURCE)
            .to_string();
        let source_title = non_blank(event.title_hint.as_deref())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| source_page.clone());
        Self {
            url: event.url,
            source_page,
            source_title,
            session_key,
            timestamp: event.observed_at,
            kind,
        }
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
