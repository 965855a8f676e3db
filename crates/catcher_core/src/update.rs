use crate::{
    bounded_log, classify, is_target, CapturedRecord, Effect, EngineState, Msg,
    SessionKeyStrategy, StateSnapshot,
};

/// What processing a message amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Captured(CapturedRecord),
    /// URL matched none of the target patterns.
    Filtered,
    /// URL was already admitted during this engine lifetime.
    Duplicate,
    /// Capturing is switched off; the event was not looked at.
    Disabled,
    /// URL is new to the dedup index but already present in the restored log.
    AlreadyLogged,
    EnabledChanged(bool),
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Change {
    Insert {
        log: Vec<CapturedRecord>,
        url: String,
    },
    MarkSeen(String),
    SetEnabled(bool),
    Clear,
}

/// A planned transition. Nothing happens to the state until [`EngineState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    outcome: Outcome,
    effects: Vec<Effect>,
    change: Option<Change>,
}

impl Step {
    fn quiet(outcome: Outcome) -> Self {
        Self {
            outcome,
            effects: Vec::new(),
            change: None,
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Effects in execution order: a commit always precedes any notification.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }
}

/// Pure planning function: decides what `msg` does to `state` without
/// mutating it, so a failed commit can simply discard the step.
pub fn update(state: &EngineState, msg: Msg, sessions: &dyn SessionKeyStrategy) -> Step {
    match msg {
        Msg::Capture(event) => {
            if !state.enabled {
                return Step::quiet(Outcome::Disabled);
            }
            if !is_target(&event.url) {
                return Step::quiet(Outcome::Filtered);
            }
            if state.dedup.seen(&event.url) {
                return Step::quiet(Outcome::Duplicate);
            }

            let kind = classify(&event.url);
            let url = event.url.clone();
            let session_key = sessions.derive(&event);
            let record = CapturedRecord::from_event(event, kind, session_key);

            match bounded_log::insert(&state.log, record.clone()) {
                Some(log) => Step {
                    effects: vec![
                        Effect::Commit(StateSnapshot::new(state.enabled, log.clone())),
                        Effect::Notify(record.clone()),
                    ],
                    outcome: Outcome::Captured(record),
                    change: Some(Change::Insert { log, url }),
                },
                None => Step {
                    outcome: Outcome::AlreadyLogged,
                    effects: Vec::new(),
                    change: Some(Change::MarkSeen(url)),
                },
            }
        }
        Msg::SetEnabled(enabled) => {
            if enabled == state.enabled {
                return Step::quiet(Outcome::EnabledChanged(enabled));
            }
            Step {
                outcome: Outcome::EnabledChanged(enabled),
                effects: vec![Effect::Commit(StateSnapshot::new(
                    enabled,
                    state.log.clone(),
                ))],
                change: Some(Change::SetEnabled(enabled)),
            }
        }
        Msg::Clear => Step {
            outcome: Outcome::Cleared,
            effects: vec![Effect::Commit(StateSnapshot::new(state.enabled, Vec::new()))],
            change: Some(Change::Clear),
        },
    }
}

impl EngineState {
    /// Applies a planned step and returns its outcome.
    pub fn apply(&mut self, step: Step) -> Outcome {
        match step.change {
            Some(Change::Insert { log, url }) => {
                self.dedup.mark_seen(url);
                self.log = log;
            }
            Some(Change::MarkSeen(url)) => self.dedup.mark_seen(url),
            Some(Change::SetEnabled(enabled)) => self.enabled = enabled,
            Some(Change::Clear) => {
                self.log.clear();
                self.dedup.clear();
            }
            None => {}
        }
        step.outcome
    }
}
