use std::sync::mpsc::{self, TrySendError};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use catcher_core::{
    update, CaptureEvent, DownloadRequest, Effect, EngineState, Msg, Outcome, SessionKeyMode,
    SessionKeyStrategy, StateSnapshot, StitchRequest,
};
use engine_logging::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};
use tokio::runtime::Runtime;

use crate::notifier::Notifier;
use crate::store::{commit_snapshot, load_snapshot, StateStore};
use crate::{
    EngineError, EngineEvent, FailureKind, HttpSink, NotificationSink, SinkError, SinkReceipt,
    SinkSettings,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sink: SinkSettings,
    /// Pending capture notifications kept before new ones are dropped.
    pub notify_queue_depth: usize,
    /// Undrained [`EngineEvent`]s kept before new ones are dropped.
    pub event_queue_depth: usize,
    pub session_keys: SessionKeyMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sink: SinkSettings::default(),
            notify_queue_depth: 64,
            event_queue_depth: 256,
            session_keys: SessionKeyMode::default(),
        }
    }
}

type Reply<T> = mpsc::Sender<Result<T, EngineError>>;

enum EngineCommand {
    Capture {
        event: CaptureEvent,
        reply: Option<Reply<Outcome>>,
    },
    SetEnabled {
        enabled: bool,
        reply: Reply<()>,
    },
    Clear {
        reply: Reply<()>,
    },
    Sync {
        reply: Reply<()>,
    },
    Sink {
        request: SinkRequest,
        reply: Reply<SinkReceipt>,
    },
}

/// A sink call run on the worker's runtime.
enum SinkRequest {
    Download(DownloadRequest),
    Stitch(StitchRequest),
    Health,
}

impl SinkRequest {
    async fn send(&self, sink: &dyn NotificationSink) -> Result<SinkReceipt, SinkError> {
        match self {
            SinkRequest::Download(request) => sink.request_download(request).await,
            SinkRequest::Stitch(request) => sink.request_stitch(request).await,
            SinkRequest::Health => sink.health().await,
        }
    }
}

/// Handle to the engine loop. Cheap to clone; the loop stops once every
/// handle is dropped.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
    snapshot: Arc<RwLock<StateSnapshot>>,
}

impl EngineHandle {
    /// Starts the engine with an HTTP sink built from `config.sink`.
    pub fn start(config: EngineConfig, store: Arc<dyn StateStore>) -> Result<Self, EngineError> {
        let sink = Arc::new(HttpSink::new(config.sink.clone())?);
        Self::start_with_sink(config, store, sink)
    }

    /// Starts the engine loop. The log and enabled flag are restored from
    /// `store`; the dedup index always starts empty.
    pub fn start_with_sink(
        config: EngineConfig,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, EngineError> {
        let restored = load_snapshot(store.as_ref())?;
        engine_info!(
            "Engine starting: enabled={} restored_records={}",
            restored.enabled,
            restored.count
        );
        let state = EngineState::restore(restored);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("catcher-sink")
            .enable_all()
            .build()
            .map_err(EngineError::Runtime)?;
        let notifier = Notifier::spawn(
            runtime.handle(),
            sink.clone(),
            config.notify_queue_depth,
            config.sink.timeout,
        );

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::sync_channel(config.event_queue_depth.max(1));
        let snapshot = Arc::new(RwLock::new(state.snapshot()));

        let worker = Worker {
            state,
            store,
            sessions: config.session_keys.strategy(),
            snapshot: snapshot.clone(),
            notifier,
            event_tx,
            events_dropped: 0,
            sink,
            sink_timeout: config.sink.timeout,
            runtime,
        };
        thread::Builder::new()
            .name("catcher-engine".to_string())
            .spawn(move || worker.run(cmd_rx))
            .map_err(EngineError::Runtime)?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            snapshot,
        })
    }

    /// Pushes an event without waiting for it to be processed.
    pub fn submit(&self, event: CaptureEvent) {
        if self
            .cmd_tx
            .send(EngineCommand::Capture { event, reply: None })
            .is_err()
        {
            engine_warn!("Engine loop stopped, capture event dropped");
        }
    }

    /// Pushes an event and waits for its outcome.
    pub fn capture(&self, event: CaptureEvent) -> Result<Outcome, EngineError> {
        self.call(|reply| EngineCommand::Capture {
            event,
            reply: Some(reply),
        })
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), EngineError> {
        self.call(|reply| EngineCommand::SetEnabled { enabled, reply })
    }

    /// Empties log, count and dedup index in one step.
    pub fn clear(&self) -> Result<(), EngineError> {
        self.call(|reply| EngineCommand::Clear { reply })
    }

    /// Returns once every command submitted before it has been processed.
    pub fn sync(&self) -> Result<(), EngineError> {
        self.call(|reply| EngineCommand::Sync { reply })
    }

    /// Snapshot of the most recent completed commit.
    pub fn query(&self) -> StateSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    /// Sink calls run on the engine's own runtime; the caller only waits on
    /// a reply channel, so these are safe to call from async code too.
    pub fn request_download(&self, url: &str, title: &str) -> Result<SinkReceipt, EngineError> {
        let request = DownloadRequest::new(url, title)?;
        let receipt = self.call_sink(SinkRequest::Download(request));
        log_request("download", url, &receipt);
        receipt
    }

    /// Asks the sink to reassemble every record of the session.
    pub fn request_stitch(&self, session_key: &str, title: &str) -> Result<SinkReceipt, EngineError> {
        let request = StitchRequest::for_session(&self.query(), session_key, title)?;
        let receipt = self.call_sink(SinkRequest::Stitch(request));
        log_request("stitch", session_key, &receipt);
        receipt
    }

    /// Probes the sink's health endpoint.
    pub fn health(&self) -> Result<SinkReceipt, EngineError> {
        self.call_sink(SinkRequest::Health)
    }

    fn call<T>(&self, command: impl FnOnce(Reply<T>) -> EngineCommand) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(command(reply_tx))
            .map_err(|_| EngineError::Stopped)?;
        reply_rx.recv().map_err(|_| EngineError::Stopped)?
    }

    fn call_sink(&self, request: SinkRequest) -> Result<SinkReceipt, EngineError> {
        self.call(|reply| EngineCommand::Sink { request, reply })
    }
}

fn log_request(kind: &str, subject: &str, receipt: &Result<SinkReceipt, EngineError>) {
    match receipt {
        Ok(receipt) => engine_info!("Sink accepted {} for {} (status {})", kind, subject, receipt.status),
        Err(err) => engine_warn!("Sink rejected {} for {}: {}", kind, subject, err),
    }
}

/// Single writer: owns the state and applies every transition in order.
struct Worker {
    state: EngineState,
    store: Arc<dyn StateStore>,
    sessions: Box<dyn SessionKeyStrategy>,
    snapshot: Arc<RwLock<StateSnapshot>>,
    notifier: Notifier,
    event_tx: mpsc::SyncSender<EngineEvent>,
    events_dropped: u64,
    sink: Arc<dyn NotificationSink>,
    sink_timeout: Duration,
    // Dropped with the worker, on the engine thread.
    runtime: Runtime,
}

impl Worker {
    fn run(mut self, cmd_rx: mpsc::Receiver<EngineCommand>) {
        while let Ok(command) = cmd_rx.recv() {
            self.handle(command);
        }
        engine_info!("Engine loop stopped");
    }

    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Capture { event, reply } => {
                let url = event.url.clone();
                let result = self.process(Msg::Capture(event));
                match &result {
                    Ok(outcome) => log_outcome(&url, outcome),
                    Err(err) => {
                        engine_error!("Dropping capture of {}: {}", url, err);
                        self.publish_event(EngineEvent::CommitFailed {
                            url: Some(url),
                            error: err.to_string(),
                        });
                    }
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            EngineCommand::SetEnabled { enabled, reply } => {
                let result = self.process_command(Msg::SetEnabled(enabled));
                if result.is_ok() {
                    engine_info!("Capturing {}", if enabled { "enabled" } else { "disabled" });
                }
                let _ = reply.send(result);
            }
            EngineCommand::Clear { reply } => {
                let result = self.process_command(Msg::Clear);
                if result.is_ok() {
                    engine_info!("Capture log cleared");
                }
                let _ = reply.send(result);
            }
            EngineCommand::Sync { reply } => {
                let _ = reply.send(Ok(()));
            }
            EngineCommand::Sink { request, reply } => {
                let sink = self.sink.clone();
                let timeout = self.sink_timeout;
                self.runtime.spawn(async move {
                    let result = tokio::time::timeout(timeout, request.send(sink.as_ref()))
                        .await
                        .unwrap_or_else(|_| {
                            Err(SinkError::new(FailureKind::Timeout, "sink call timed out"))
                        });
                    let _ = reply.send(result.map_err(EngineError::from));
                });
            }
        }
    }

    fn process_command(&mut self, msg: Msg) -> Result<(), EngineError> {
        self.process(msg).map(|_| ()).inspect_err(|err| {
            engine_error!("Command failed, state unchanged: {}", err);
            self.publish_event(EngineEvent::CommitFailed {
                url: None,
                error: err.to_string(),
            });
        })
    }

    /// Plans the message, commits it, then applies it. A failed commit
    /// leaves the state exactly as it was.
    fn process(&mut self, msg: Msg) -> Result<Outcome, EngineError> {
        let step = update(&self.state, msg, self.sessions.as_ref());

        let mut committed = false;
        let mut notifications = Vec::new();
        for effect in step.effects() {
            match effect {
                Effect::Commit(snapshot) => {
                    commit_snapshot(self.store.as_ref(), snapshot)?;
                    committed = true;
                }
                Effect::Notify(record) => notifications.push(record.clone()),
            }
        }

        let outcome = self.state.apply(step);
        if committed {
            *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = self.state.snapshot();
        }
        if let Outcome::Captured(record) = &outcome {
            self.publish_event(EngineEvent::Captured(record.clone()));
        }
        for record in notifications {
            self.notifier.enqueue(record);
        }
        Ok(outcome)
    }

    /// Best effort: a full event queue drops the event, warning once per
    /// run of drops.
    fn publish_event(&mut self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {
                if self.events_dropped > 0 {
                    engine_info!("Event queue drained, {} events were dropped", self.events_dropped);
                    self.events_dropped = 0;
                }
            }
            Err(TrySendError::Full(event)) => {
                if self.events_dropped == 0 {
                    engine_warn!("Event queue full, dropping events starting with {:?}", event);
                }
                self.events_dropped += 1;
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

fn log_outcome(url: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Captured(record) => engine_info!(
            "Captured {} url={} session={}",
            record.kind,
            record.url,
            record.session_key
        ),
        Outcome::Duplicate => engine_debug!("Duplicate url={}", url),
        Outcome::AlreadyLogged => engine_debug!("Already in restored log url={}", url),
        Outcome::Filtered | Outcome::Disabled => engine_trace!("Ignored url={} ({:?})", url, outcome),
        Outcome::EnabledChanged(_) | Outcome::Cleared => {}
    }
}
