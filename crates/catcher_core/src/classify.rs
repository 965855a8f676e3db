use std::fmt;

use serde::{Deserialize, Serialize};

/// URL substrings that mark a request as adaptive-media traffic.
pub const TARGET_PATTERNS: [&str; 4] = [".mpd", ".m3u8", "init.mp4", ".m4s"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    ManifestDash,
    ManifestHls,
    Segment,
    Unknown,
}

impl StreamKind {
    pub fn is_manifest(self) -> bool {
        matches!(self, StreamKind::ManifestDash | StreamKind::ManifestHls)
    }

    pub fn is_target(self) -> bool {
        self != StreamKind::Unknown
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::ManifestDash => write!(f, "DASH manifest"),
            StreamKind::ManifestHls => write!(f, "HLS manifest"),
            StreamKind::Segment => write!(f, "segment"),
            StreamKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classifies a URL by substring match. First match wins: DASH, HLS, segment.
pub fn classify(url: &str) -> StreamKind {
    if url.contains(".mpd") {
        StreamKind::ManifestDash
    } else if url.contains(".m3u8") {
        StreamKind::ManifestHls
    } else if url.contains("init.mp4") || url.contains(".m4s") {
        StreamKind::Segment
    } else {
        StreamKind::Unknown
    }
}

/// Interest filter applied before any state is touched.
pub fn is_target(url: &str) -> bool {
    TARGET_PATTERNS.iter().any(|pattern| url.contains(pattern))
}
