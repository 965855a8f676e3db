use serde::Serialize;
use thiserror::Error;

use crate::{SessionKey, StateSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("url must not be empty")]
    EmptyUrl,
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("session key must not be empty")]
    EmptySessionKey,
    #[error("no captured records for session {0}")]
    UnknownSession(String),
}

/// User-initiated request to download one captured stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    pub title: String,
}

impl DownloadRequest {
    pub fn new(url: &str, title: &str) -> Result<Self, RequestError> {
        let url = url.trim();
        let title = title.trim();
        if url.is_empty() {
            return Err(RequestError::EmptyUrl);
        }
        if title.is_empty() {
            return Err(RequestError::EmptyTitle);
        }
        Ok(Self {
            url: url.to_string(),
            title: title.to_string(),
        })
    }
}

/// User-initiated request to reassemble all records of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StitchRequest {
    pub session_key: SessionKey,
    pub title: String,
    /// Record URLs in capture order, oldest first.
    pub urls: Vec<String>,
}

impl StitchRequest {
    pub fn for_session(
        snapshot: &StateSnapshot,
        session_key: &str,
        title: &str,
    ) -> Result<Self, RequestError> {
        let session_key = session_key.trim();
        let title = title.trim();
        if session_key.is_empty() {
            return Err(RequestError::EmptySessionKey);
        }
        if title.is_empty() {
            return Err(RequestError::EmptyTitle);
        }

        let key = SessionKey::new(session_key);
        let urls: Vec<String> = snapshot
            .records_for_session(&key)
            .into_iter()
            .rev()
            .map(|record| record.url.clone())
            .collect();
        if urls.is_empty() {
            return Err(RequestError::UnknownSession(session_key.to_string()));
        }

        Ok(Self {
            session_key: key,
            title: title.to_string(),
            urls,
        })
    }
}
