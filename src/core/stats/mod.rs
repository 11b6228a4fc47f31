use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Point-in-time view of a [`TrackedQueue`](crate::TrackedQueue)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub buffered: usize,         // items waiting to be dequeued
    pub unfinished_tasks: usize, // pushed but not yet marked done
    pub enqueued_total: u64,
    pub completed_total: u64,
}

impl QueueStats {
    /// Items dequeued but not yet marked done
    pub fn in_flight(&self) -> usize {
        self.unfinished_tasks.saturating_sub(self.buffered)
    }

    pub fn is_drained(&self) -> bool {
        self.unfinished_tasks == 0
    }
}

/// Append snapshots to `path` as NDJSON, creating the file if needed
pub fn append_stats(stats: &[QueueStats], path: impl AsRef<Path>) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;

    for entry in stats {
        let json = serde_json::to_string(entry).map_err(io::Error::other)?;
        writeln!(file, "{}", json)?; // one JSON object per line
    }
    Ok(())
}
