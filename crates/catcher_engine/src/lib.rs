//! Stream catcher engine: the single-writer event loop, the state store and
//! the notification sink.
mod engine;
mod notifier;
mod persist;
mod sink;
mod store;
mod types;

pub use engine::{EngineConfig, EngineHandle};
pub use persist::PersistError;
pub use sink::{HttpSink, NotificationSink, SinkSettings};
pub use store::{
    commit_snapshot, load_snapshot, FileStore, MemoryStore, StateStore, StoreError, KEY_COUNT,
    KEY_ENABLED, KEY_LOG,
};
pub use types::{EngineError, EngineEvent, FailureKind, SinkError, SinkReceipt};
