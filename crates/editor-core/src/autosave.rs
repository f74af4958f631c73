use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::block::DocumentId;
use crate::pages::StoreError;

/// Quiet period after the last change before a save goes out.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(800);

/// Time source for the coordinator. Tests drive a manual implementation so
/// debounce behavior is checked by advancing a virtual clock, never by
/// sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// One outgoing save, carrying the latest known title/content pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub document: DocumentId,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Error)]
#[error("save failed: {0}")]
pub struct SaveFailed(#[from] pub StoreError);

#[derive(Debug, Default)]
struct DocState {
    pending: Option<(String, String)>,
    deadline: Option<Instant>,
    in_flight: bool,
    status: SaveStatus,
    last_saved_at: Option<i64>,
}

/// Debounces change notifications into save requests, one document at a
/// time: at most one request is in flight per document, and a change that
/// lands mid-flight is dispatched immediately after the flight resolves, so
/// a stale save can never overwrite a newer one.
///
/// The host drives it: `notify_change`/`request_save_now` on edits, `poll`
/// from its tick loop, `complete` when the persistence call resolves.
pub struct AutosaveCoordinator<C: Clock = SystemClock> {
    clock: C,
    window: Duration,
    docs: HashMap<DocumentId, DocState>,
}

impl AutosaveCoordinator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for AutosaveCoordinator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> AutosaveCoordinator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_window(clock, DEBOUNCE_WINDOW)
    }

    pub fn with_window(clock: C, window: Duration) -> Self {
        Self {
            clock,
            window,
            docs: HashMap::new(),
        }
    }

    /// Records the latest `(title, content)` for the document and restarts
    /// its debounce timer. While a save is in flight the payload is parked;
    /// completion schedules the follow-up.
    pub fn notify_change(&mut self, document: DocumentId, title: String, content: String) {
        let now = self.clock.now();
        let state = self.docs.entry(document).or_default();
        state.pending = Some((title, content));
        if matches!(state.status, SaveStatus::Saved | SaveStatus::Error) {
            state.status = SaveStatus::Idle;
        }
        if !state.in_flight {
            state.deadline = Some(now + self.window);
        }
        tracing::debug!(?document, in_flight = state.in_flight, "change recorded");
    }

    /// Manual save: bypasses the debounce window but still honors the
    /// at-most-one-in-flight rule.
    pub fn request_save_now(&mut self, document: DocumentId, title: String, content: String) {
        let now = self.clock.now();
        let state = self.docs.entry(document).or_default();
        state.pending = Some((title, content));
        if matches!(state.status, SaveStatus::Saved | SaveStatus::Error) {
            state.status = SaveStatus::Idle;
        }
        if !state.in_flight {
            state.deadline = Some(now);
        }
    }

    pub fn status(&self, document: DocumentId) -> SaveStatus {
        self.docs
            .get(&document)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    /// Update timestamp carried by the last successful save, for display.
    pub fn last_saved_at(&self, document: DocumentId) -> Option<i64> {
        self.docs.get(&document).and_then(|s| s.last_saved_at)
    }

    pub fn next_deadline(&self, document: DocumentId) -> Option<Instant> {
        self.docs.get(&document).and_then(|s| s.deadline)
    }

    /// Returns every save request that is due. Each returned document is
    /// marked in flight until the host calls `complete` for it.
    pub fn poll(&mut self) -> Vec<SaveRequest> {
        let now = self.clock.now();
        let mut due = Vec::new();
        for (document, state) in self.docs.iter_mut() {
            if state.in_flight {
                continue;
            }
            let ready = state.deadline.is_some_and(|d| d <= now);
            if !ready {
                continue;
            }
            let Some((title, content)) = state.pending.take() else {
                state.deadline = None;
                continue;
            };
            state.deadline = None;
            state.in_flight = true;
            state.status = SaveStatus::Saving;
            tracing::debug!(?document, "dispatching save");
            due.push(SaveRequest {
                document: *document,
                title,
                content,
            });
        }
        due
    }

    /// Resolves the in-flight save for the document. On success the carried
    /// timestamp is kept for display; on failure the status turns `Error`
    /// and the next edit or manual save retries. Either way, a payload that
    /// arrived mid-flight is scheduled immediately.
    pub fn complete(
        &mut self,
        document: DocumentId,
        result: Result<i64, SaveFailed>,
    ) -> SaveStatus {
        let now = self.clock.now();
        let state = self.docs.entry(document).or_default();
        state.in_flight = false;
        match result {
            Ok(updated_at) => {
                state.status = SaveStatus::Saved;
                state.last_saved_at = Some(updated_at);
            }
            Err(err) => {
                state.status = SaveStatus::Error;
                tracing::warn!(?document, %err, "save failed, keeping local state");
            }
        }
        if state.pending.is_some() {
            state.deadline = Some(now);
        }
        state.status
    }
}
