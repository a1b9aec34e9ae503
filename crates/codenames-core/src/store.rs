// Snapshot store: exactly one authoritative `GameView` at a time.
//
// Every accepted snapshot replaces the previous one wholesale. Nothing is
// merged. The only snapshot ever refused is one whose `seq` is lower than the
// stored one's, which can only happen when a message from a socket that has
// since been replaced lands after a newer one. Snapshots without `seq` are
// always accepted (last write wins).

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::view::GameView;

#[derive(Debug, Clone, PartialEq)]
pub enum Replace {
    /// The snapshot is now current. Carries the one it superseded.
    Accepted { previous: Option<GameView> },
    /// The snapshot is older than the stored one and was dropped.
    Stale { current: u64, incoming: u64 },
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<GameView>,
    received_at: Option<DateTime<Utc>>,
    accepted: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, view: GameView) -> Replace {
        if let (Some(current), Some(incoming)) =
            (self.current.as_ref().and_then(|v| v.seq), view.seq)
        {
            if incoming < current {
                warn!(current, incoming, "dropping stale snapshot");
                return Replace::Stale { current, incoming };
            }
        }

        self.accepted += 1;
        self.received_at = Some(Utc::now());
        Replace::Accepted {
            previous: self.current.replace(view),
        }
    }

    pub fn current(&self) -> Option<&GameView> {
        self.current.as_ref()
    }

    /// When the current snapshot was accepted.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    /// Number of snapshots accepted over the store's lifetime.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }
}
