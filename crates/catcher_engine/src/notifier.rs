use std::sync::Arc;
use std::time::Duration;

use catcher_core::CapturedRecord;
use engine_logging::{engine_debug, engine_warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::NotificationSink;

/// Bounded queue in front of the sink, drained by one detached task.
///
/// Enqueueing never blocks the engine loop; a full queue drops the record.
pub(crate) struct Notifier {
    tx: mpsc::Sender<CapturedRecord>,
}

impl Notifier {
    pub(crate) fn spawn(
        runtime: &Handle,
        sink: Arc<dyn NotificationSink>,
        depth: usize,
        timeout: Duration,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<CapturedRecord>(depth.max(1));
        runtime.spawn(async move {
            while let Some(record) = rx.recv().await {
                match tokio::time::timeout(timeout, sink.notify_capture(&record)).await {
                    Ok(Ok(receipt)) => {
                        engine_debug!("Sink accepted {} (status {})", record.url, receipt.status);
                    }
                    Ok(Err(err)) => {
                        engine_warn!("Sink notification for {} failed: {}", record.url, err);
                    }
                    Err(_) => {
                        engine_warn!("Sink notification for {} timed out", record.url);
                    }
                }
            }
        });
        Self { tx }
    }

    pub(crate) fn enqueue(&self, record: CapturedRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                engine_warn!("Notification queue full, dropping {}", record.url);
            }
            Err(TrySendError::Closed(record)) => {
                engine_warn!("Notifier stopped, dropping {}", record.url);
            }
        }
    }
}
