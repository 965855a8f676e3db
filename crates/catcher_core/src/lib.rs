//! Stream catcher core: pure classification, dedup, session grouping and the
//! bounded capture log, plus the planning state machine that ties them together.
mod bounded_log;
mod classify;
mod dedup;
mod effect;
mod msg;
mod record;
mod request;
mod session;
mod state;
mod update;
mod view_model;

pub use bounded_log::{
    contains_url, insert as insert_record, normalize as normalize_log, LOG_CAPACITY,
};
pub use classify::{classify, is_target, StreamKind, TARGET_PATTERNS};
pub use dedup::DedupIndex;
pub use effect::Effect;
pub use msg::Msg;
pub use record::{CaptureEvent, CapturedRecord, UNKNOWN_SOURCE};
pub use request::{DownloadRequest, RequestError, StitchRequest};
pub use session::{
    OriginSessionKeys, PageSessionKeys, SessionKey, SessionKeyMode, SessionKeyStrategy,
};
pub use state::EngineState;
pub use update::{update, Outcome, Step};
pub use view_model::{SessionSummary, StateSnapshot};
