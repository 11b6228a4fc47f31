pub mod core;

pub use crate::core::{
    error::TimeoutError,
    guard::TaskDoneGuard,
    queue::TrackedQueue,
    stats::{append_stats, QueueStats},
};
