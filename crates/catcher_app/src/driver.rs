//! Line-oriented command driver.
//!
//! Each input line is one JSON command; each command produces one JSON
//! response line. Engine events are written as extra lines tagged `event`.

use std::io::{self, BufRead, Write};

use catcher_core::{CaptureEvent, Outcome, SessionKey};
use catcher_engine::{EngineError, EngineEvent, EngineHandle, SinkReceipt};
use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_warn};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Command {
    Capture {
        url: String,
        initiator: Option<String>,
        title: Option<String>,
        session: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
    SetEnabled {
        enabled: bool,
    },
    Clear,
    Query {
        session: Option<String>,
    },
    Sessions,
    Download {
        url: String,
        title: String,
    },
    Stitch {
        session: String,
        title: String,
    },
    Health,
}

pub fn run(engine: &EngineHandle, input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(engine, &line);
        writeln!(output, "{response}")?;
        for event in drain_events(engine) {
            writeln!(output, "{event}")?;
        }
        output.flush()?;
    }
    Ok(())
}

pub fn handle_line(engine: &EngineHandle, line: &str) -> Value {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(err) => {
            engine_warn!("Rejected malformed command: {}", err);
            return failure(format!("malformed command: {err}"));
        }
    };
    match execute(engine, command) {
        Ok(value) => value,
        Err(err) => failure(err.to_string()),
    }
}

fn execute(engine: &EngineHandle, command: Command) -> Result<Value, EngineError> {
    match command {
        Command::Capture {
            url,
            initiator,
            title,
            session,
            timestamp,
        } => {
            let event = CaptureEvent {
                url,
                initiator_page: initiator,
                observed_at: timestamp.unwrap_or_else(Utc::now),
                title_hint: title,
                session_hint: session,
            };
            let outcome = engine.capture(event)?;
            Ok(json!({ "ok": true, "outcome": outcome_label(&outcome) }))
        }
        Command::SetEnabled { enabled } => {
            engine.set_enabled(enabled)?;
            Ok(json!({ "ok": true, "enabled": enabled }))
        }
        Command::Clear => {
            engine.clear()?;
            Ok(json!({ "ok": true }))
        }
        Command::Query { session } => {
            let snapshot = engine.query();
            let records = match session {
                Some(key) => json!(snapshot.records_for_session(&SessionKey::new(key))),
                None => json!(snapshot.log),
            };
            Ok(json!({
                "ok": true,
                "enabled": snapshot.enabled,
                "count": snapshot.count,
                "records": records,
            }))
        }
        Command::Sessions => Ok(json!({ "ok": true, "sessions": engine.query().sessions() })),
        Command::Download { url, title } => {
            receipt_response(engine.request_download(&url, &title)?)
        }
        Command::Stitch { session, title } => {
            receipt_response(engine.request_stitch(&session, &title)?)
        }
        Command::Health => receipt_response(engine.health()?),
    }
}

fn receipt_response(receipt: SinkReceipt) -> Result<Value, EngineError> {
    Ok(json!({ "ok": true, "status": receipt.status, "body": receipt.body }))
}

fn failure(message: String) -> Value {
    json!({ "ok": false, "error": message })
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Captured(_) => "captured",
        Outcome::Filtered => "filtered",
        Outcome::Duplicate => "duplicate",
        Outcome::Disabled => "disabled",
        Outcome::AlreadyLogged => "already_logged",
        Outcome::EnabledChanged(_) => "enabled_changed",
        Outcome::Cleared => "cleared",
    }
}

fn drain_events(engine: &EngineHandle) -> Vec<Value> {
    let mut events = Vec::new();
    while let Some(event) = engine.try_recv() {
        engine_debug!("Engine event: {:?}", event);
        events.push(match event {
            EngineEvent::Captured(record) => json!({ "event": "captured", "record": record }),
            EngineEvent::CommitFailed { url, error } => {
                json!({ "event": "commit_failed", "url": url, "error": error })
            }
        });
    }
    events
}
