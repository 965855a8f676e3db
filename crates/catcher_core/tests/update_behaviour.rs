use std::sync::Once;

use catcher_core::{
    update, CaptureEvent, Effect, EngineState, Msg, Outcome, PageSessionKeys, SessionKey,
    StateSnapshot, StreamKind, LOG_CAPACITY,
};
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

fn event(url: &str, secs: i64) -> CaptureEvent {
    CaptureEvent::new(url, at(secs)).with_initiator("https://videos.example.com/watch?v=1")
}

/// Plans and applies a message as the engine would with a store that never fails.
fn step(state: &mut EngineState, msg: Msg) -> (Outcome, Vec<Effect>) {
    let planned = update(state, msg, &PageSessionKeys);
    let effects = planned.effects().to_vec();
    (state.apply(planned), effects)
}

fn capture(state: &mut EngineState, url: &str, secs: i64) -> Outcome {
    step(state, Msg::Capture(event(url, secs))).0
}

fn log_urls(state: &EngineState) -> Vec<&str> {
    state.log().iter().map(|r| r.url.as_str()).collect()
}

#[test]
fn mixed_sequence_keeps_newest_first_and_drops_duplicate() {
    init_logging();
    let mut state = EngineState::new();

    assert!(matches!(capture(&mut state, "a.mpd", 1), Outcome::Captured(_)));
    assert!(matches!(capture(&mut state, "seg1.m4s", 2), Outcome::Captured(_)));
    assert_eq!(capture(&mut state, "seg1.m4s", 3), Outcome::Duplicate);
    assert!(matches!(capture(&mut state, "b.m3u8", 4), Outcome::Captured(_)));

    let snapshot = state.snapshot();
    assert_eq!(snapshot.count, 3);
    let kinds: Vec<(&str, StreamKind)> = snapshot
        .log
        .iter()
        .map(|r| (r.url.as_str(), r.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("b.m3u8", StreamKind::ManifestHls),
            ("seg1.m4s", StreamKind::Segment),
            ("a.mpd", StreamKind::ManifestDash),
        ]
    );
}

#[test]
fn capture_commits_before_notifying() {
    init_logging();
    let mut state = EngineState::new();
    let (outcome, effects) = step(&mut state, Msg::Capture(event("x.m3u8", 1)));

    let Outcome::Captured(record) = outcome else {
        panic!("expected capture");
    };
    assert_eq!(
        effects,
        vec![
            Effect::Commit(StateSnapshot::new(true, vec![record.clone()])),
            Effect::Notify(record.clone()),
        ]
    );
    assert_eq!(record.source_page, "https://videos.example.com/watch?v=1");
    assert_eq!(record.source_title, record.source_page);
    assert_eq!(record.session_key, SessionKey::new("https://videos.example.com/watch?v=1"));
    assert_eq!(record.timestamp, at(1));
}

#[test]
fn non_target_urls_leave_state_untouched() {
    init_logging();
    let mut state = EngineState::new();
    capture(&mut state, "a.mpd", 1);
    let before = state.clone();

    for url in ["https://x.example.com/app.js", "video.mp4", "style.css"] {
        let (outcome, effects) = step(&mut state, Msg::Capture(event(url, 2)));
        assert_eq!(outcome, Outcome::Filtered);
        assert!(effects.is_empty());
    }
    assert_eq!(state, before);
}

#[test]
fn capacity_is_enforced_and_oldest_evicted() {
    init_logging();
    let mut state = EngineState::new();
    let extra = 4;
    for i in 0..LOG_CAPACITY + extra {
        capture(&mut state, &format!("https://cdn.example.com/{i}.m4s"), i as i64);
    }

    assert_eq!(state.log().len(), LOG_CAPACITY);
    assert_eq!(state.snapshot().count, LOG_CAPACITY);
    for i in 0..extra {
        let url = format!("https://cdn.example.com/{i}.m4s");
        assert!(state.snapshot().find(&url).is_none(), "{url} should be evicted");
    }
    // Evicted URLs stay in the dedup index for the engine lifetime.
    assert_eq!(
        capture(&mut state, "https://cdn.example.com/0.m4s", 999),
        Outcome::Duplicate
    );
}

#[test]
fn clear_resets_log_count_and_dedup() {
    init_logging();
    let mut state = EngineState::new();
    capture(&mut state, "a.mpd", 1);
    capture(&mut state, "seg1.m4s", 2);

    let (outcome, effects) = step(&mut state, Msg::Clear);
    assert_eq!(outcome, Outcome::Cleared);
    assert_eq!(effects, vec![Effect::Commit(StateSnapshot::new(true, Vec::new()))]);

    let snapshot = state.snapshot();
    assert!(snapshot.log.is_empty());
    assert_eq!(snapshot.count, 0);
    assert!(state.dedup().is_empty());

    assert!(matches!(capture(&mut state, "a.mpd", 3), Outcome::Captured(_)));
}

#[test]
fn disabled_engine_ignores_events_without_marking_them() {
    init_logging();
    let mut state = EngineState::new();
    let (outcome, _) = step(&mut state, Msg::SetEnabled(false));
    assert_eq!(outcome, Outcome::EnabledChanged(false));
    let before = state.clone();

    assert_eq!(capture(&mut state, "late.m3u8", 1), Outcome::Disabled);
    assert_eq!(state, before);
    assert!(state.dedup().is_empty());

    step(&mut state, Msg::SetEnabled(true));
    assert!(matches!(capture(&mut state, "late.m3u8", 2), Outcome::Captured(_)));
}

#[test]
fn toggling_to_current_value_commits_nothing() {
    init_logging();
    let mut state = EngineState::new();
    let (outcome, effects) = step(&mut state, Msg::SetEnabled(true));
    assert_eq!(outcome, Outcome::EnabledChanged(true));
    assert!(effects.is_empty());

    let (_, effects) = step(&mut state, Msg::SetEnabled(false));
    assert_eq!(effects, vec![Effect::Commit(StateSnapshot::new(false, Vec::new()))]);
}

#[test]
fn discarded_step_leaves_url_eligible() {
    init_logging();
    let state = EngineState::new();
    // Planning alone must not mark the URL as seen.
    let planned = update(&state, Msg::Capture(event("a.mpd", 1)), &PageSessionKeys);
    assert!(matches!(planned.outcome(), Outcome::Captured(_)));

    assert!(state.dedup().is_empty());
    assert!(state.log().is_empty());
}

#[test]
fn restored_log_is_not_duplicated_after_restart() {
    init_logging();
    let mut first_run = EngineState::new();
    capture(&mut first_run, "a.mpd", 1);
    capture(&mut first_run, "seg1.m4s", 2);

    let mut restarted = EngineState::restore(first_run.snapshot());
    assert!(restarted.dedup().is_empty());
    assert_eq!(log_urls(&restarted), vec!["seg1.m4s", "a.mpd"]);

    let (outcome, effects) = step(&mut restarted, Msg::Capture(event("a.mpd", 3)));
    assert_eq!(outcome, Outcome::AlreadyLogged);
    assert!(effects.is_empty());
    assert!(restarted.dedup().seen("a.mpd"));
    assert_eq!(capture(&mut restarted, "a.mpd", 4), Outcome::Duplicate);
    assert_eq!(log_urls(&restarted), vec!["seg1.m4s", "a.mpd"]);
}

#[test]
fn restore_keeps_disabled_flag() {
    init_logging();
    let restored = EngineState::restore(StateSnapshot::new(false, Vec::new()));
    assert!(!restored.enabled());
}
