#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The event source observed a network request.
    Capture(crate::CaptureEvent),
    /// Caller toggled capturing on or off.
    SetEnabled(bool),
    /// Caller asked to forget the log, count and dedup index.
    Clear,
}
