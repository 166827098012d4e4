//! Per-session drafts.
//!
//! Each session owns one [`DraftBuilder`] that survives between requests. The
//! builder sits behind an async mutex so a commit can hold it across store
//! calls while later edits to the same session wait their turn.
//!
//! Sessions nobody has looked up for a while are dropped by
//! [`DraftSessions::sweep_idle`], run periodically by
//! [`DraftSessions::spawn_sweeper`].

use crate::domain::DraftBuilder;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

pub type SharedDraft = Arc<Mutex<DraftBuilder>>;

struct Session {
    draft: SharedDraft,
    last_touched: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            draft: Arc::new(Mutex::new(DraftBuilder::new())),
            last_touched: Instant::now(),
        }
    }

    /// A request still holds the draft.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.draft) > 1
    }
}

#[derive(Clone, Default)]
pub struct DraftSessions {
    drafts: Arc<DashMap<Uuid, Session>>,
}

impl DraftSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session with a fresh draft and returns its id.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.drafts.insert(id, Session::new());
        tracing::debug!(draft_id = %id, "Draft session opened");
        id
    }

    /// Looks a session up and marks it as recently used.
    pub fn get(&self, id: Uuid) -> Option<SharedDraft> {
        self.drafts.get_mut(&id).map(|mut entry| {
            entry.last_touched = Instant::now();
            Arc::clone(&entry.draft)
        })
    }

    /// Returns whether a session was actually removed.
    pub fn discard(&self, id: Uuid) -> bool {
        let removed = self.drafts.remove(&id).is_some();
        if removed {
            tracing::debug!(draft_id = %id, "Draft session discarded");
        }
        removed
    }

    /// Drops sessions untouched for at least `idle` and not held by any
    /// request. Returns how many were dropped.
    pub fn sweep_idle(&self, idle: Duration) -> usize {
        let before = self.drafts.len();
        self.drafts
            .retain(|_, session| session.in_use() || session.last_touched.elapsed() < idle);
        let evicted = before.saturating_sub(self.drafts.len());
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.drafts.len(), "Idle draft sessions evicted");
        }
        evicted
    }

    /// Runs [`DraftSessions::sweep_idle`] every `every` for the life of the
    /// runtime.
    pub fn spawn_sweeper(&self, idle: Duration, every: Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                sessions.sweep_idle(idle);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}
