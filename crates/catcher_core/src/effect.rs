#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist the snapshot as one atomic unit. Must succeed before the step
    /// is applied.
    Commit(crate::StateSnapshot),
    /// Best-effort notification of a new record to the external sink.
    Notify(crate::CapturedRecord),
}
