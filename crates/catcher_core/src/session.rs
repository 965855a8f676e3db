use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::record::{non_blank, UNKNOWN_SOURCE};
use crate::CaptureEvent;

/// Opaque key grouping the records of one playback session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Derives the session key for an incoming event.
///
/// Implementations must be deterministic: the same event fields always map to
/// the same key.
pub trait SessionKeyStrategy: Send + Sync {
    fn derive(&self, event: &CaptureEvent) -> SessionKey;
}

/// Explicit hint, else the initiator page without its fragment. The query is
/// kept: `watch?v=A` and `watch?v=B` are different videos.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageSessionKeys;

impl SessionKeyStrategy for PageSessionKeys {
    fn derive(&self, event: &CaptureEvent) -> SessionKey {
        derive_with(event, |page| {
            let mut parsed = Url::parse(page).ok()?;
            parsed.set_fragment(None);
            Some(parsed.to_string())
        })
    }
}

/// Explicit hint, else the origin (`scheme://host[:port]`) of the initiator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OriginSessionKeys;

impl SessionKeyStrategy for OriginSessionKeys {
    fn derive(&self, event: &CaptureEvent) -> SessionKey {
        derive_with(event, |page| {
            let origin = Url::parse(page).ok()?.origin();
            origin.is_tuple().then(|| origin.ascii_serialization())
        })
    }
}

/// Selects one of the built-in strategies, e.g. from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum SessionKeyMode {
    #[default]
    Page,
    Origin,
}

impl SessionKeyMode {
    pub fn strategy(self) -> Box<dyn SessionKeyStrategy> {
        match self {
            SessionKeyMode::Page => Box::new(PageSessionKeys),
            SessionKeyMode::Origin => Box::new(OriginSessionKeys),
        }
    }
}

fn derive_with(event: &CaptureEvent, normalize: impl Fn(&str) -> Option<String>) -> SessionKey {
    if let Some(hint) = non_blank(event.session_hint.as_deref()) {
        return SessionKey::new(hint);
    }
    match non_blank(event.initiator_page.as_deref()) {
        Some(page) => SessionKey::new(normalize(page).unwrap_or_else(|| page.to_string())),
        None => SessionKey::new(UNKNOWN_SOURCE),
    }
}
