pub mod error;
pub mod guard;
pub mod queue;
pub mod stats;
