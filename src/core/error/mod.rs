use thiserror::Error;

/// Returned by the bounded dequeue operations when no item shows up in time.
///
/// The queue is left untouched when this is returned: nothing was removed and
/// the unfinished-task counter did not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timeout")]
pub struct TimeoutError;
