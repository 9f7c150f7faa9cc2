use std::sync::Arc;

use tokio::sync::watch;

/// Monotonic count of invalidations observed for one table.
///
/// Every push notification bumps it, as does an explicit
/// [`invalidate`](crate::sync::TableSession::invalidate). The refresh worker
/// watches for changes; the absolute value means nothing except as an
/// ordering tag for stale-pull rejection.
#[derive(Debug, Clone)]
pub struct SyncCursor {
    inner: Arc<watch::Sender<u64>>,
}

impl SyncCursor {
    pub fn new(start: u64) -> Self {
        let (tx, _) = watch::channel(start);
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Records one more invalidation and wakes every watcher. Returns the
    /// new value.
    pub fn bump(&self) -> u64 {
        let mut bumped = 0;
        self.inner.send_modify(|value| {
            *value += 1;
            bumped = *value;
        });
        bumped
    }

    pub fn value(&self) -> u64 {
        *self.inner.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.subscribe()
    }
}

/// Decides whether a completed pull may replace the local state.
///
/// Each pull is tagged with the cursor value read when the request went out.
/// By the time the response lands, newer invalidations may have produced a
/// newer application; the gate refuses any tag older than the last one
/// applied, so a slow response can never roll the mirror back. An equal tag
/// is admitted: re-pulling the same cursor value is idempotent.
#[derive(Debug)]
pub struct CursorGate {
    last_applied: u64,
}

impl CursorGate {
    pub fn new(last_applied: u64) -> Self {
        Self { last_applied }
    }

    /// Admits the pull tagged `tag`, recording it as applied, or returns
    /// `false` when the tag is stale and the snapshot must be dropped.
    pub fn admit(&mut self, tag: u64) -> bool {
        if tag < self.last_applied {
            return false;
        }
        self.last_applied = tag;
        true
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }
}
