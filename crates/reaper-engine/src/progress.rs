use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, BoxStream, StreamExt};
use jiff::Timestamp;
use reaper_core::ResourceRef;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::plan::NodeState;

/// One node moving from one state to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub resource: ResourceRef,
    pub from: NodeState,
    pub to: NodeState,
    pub at: Timestamp,
}

/// Append-only event log of one run, readable any number of times.
///
/// Every stream handed out starts at the first event and ends once the
/// run has finished and the log is drained.
#[derive(Debug, Default)]
pub struct EventFeed {
    inner: Mutex<FeedState>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct FeedState {
    events: Vec<StateChange>,
    closed: bool,
}

enum Next {
    Event(StateChange),
    Wait,
    End,
}

impl EventFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, change: StateChange) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .push(change);
        self.notify.notify_waiters();
    }

    pub fn close(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Events recorded so far.
    pub fn snapshot(&self) -> Vec<StateChange> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    fn next_at(&self, cursor: usize) -> Next {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match state.events.get(cursor) {
            Some(change) => Next::Event(change.clone()),
            None if state.closed => Next::End,
            None => Next::Wait,
        }
    }

    /// A fresh stream over the whole log, from the first event.
    pub fn stream(self: &Arc<Self>) -> BoxStream<'static, StateChange> {
        stream::unfold((Arc::clone(self), 0usize), |(feed, cursor)| async move {
            loop {
                let next = {
                    // Registered before the check so a push in between is not lost.
                    let notified = feed.notify.notified();
                    match feed.next_at(cursor) {
                        Next::Event(change) => Some(change),
                        Next::End => None,
                        Next::Wait => {
                            notified.await;
                            continue;
                        }
                    }
                };
                return next.map(|change| (change, (feed, cursor + 1)));
            }
        })
        .boxed()
    }
}
