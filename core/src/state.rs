//! Execution state of the most recent dispatch and its observers.
//!
//! The state is a single slot shared by every dispatch made through one
//! [`crate::Dispatcher`]. Concurrent dispatches are not isolated: the last
//! write wins. Callers that need their own result use the value returned by
//! `execute_tool`.

use crate::dispatcher::panic_message;
use crate::tools::ResultEnvelope;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Owned copy of the execution state handed to observers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub is_executing: bool,
    pub last_tool_used: Option<String>,
    pub last_result: Option<ResultEnvelope>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Event emitted on every state mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateChange {
    Started {
        tool: String,
    },
    Finished {
        tool: String,
        success: bool,
        duration_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ExecutionSnapshot) + Send + Sync>;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared execution state with synchronous listeners and an event stream
#[derive(Clone)]
pub struct ExecutionState {
    inner: Arc<RwLock<ExecutionSnapshot>>,
    listeners: Arc<DashMap<u64, Listener>>,
    next_listener: Arc<AtomicU64>,
    events_tx: broadcast::Sender<StateChange>,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionState {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(ExecutionSnapshot::default())),
            listeners: Arc::new(DashMap::new()),
            next_listener: Arc::new(AtomicU64::new(0)),
            events_tx,
        }
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_executing(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_executing
    }

    pub fn last_tool_used(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_tool_used
            .clone()
    }

    pub fn last_result(&self) -> Option<ResultEnvelope> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_result
            .clone()
    }

    /// Register a listener called synchronously after every state mutation
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ExecutionSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        debug!(target: "execution_state", subscription = id, "Listener subscribed");
        SubscriptionId(id)
    }

    /// Returns false when the subscription was already removed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id.0).is_some()
    }

    /// Stream of state changes for async consumers.
    ///
    /// Lagging receivers lose the oldest events, see [`broadcast`].
    pub fn watch(&self) -> broadcast::Receiver<StateChange> {
        self.events_tx.subscribe()
    }

    pub(crate) fn mark_started(&self, tool: &str) {
        {
            let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            state.is_executing = true;
            state.last_tool_used = Some(tool.to_string());
            state.updated_at = Some(Utc::now());
        }
        self.notify(StateChange::Started {
            tool: tool.to_string(),
        });
    }

    pub(crate) fn mark_finished(&self, tool: &str, result: &ResultEnvelope, duration_ms: u64) {
        {
            let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            state.is_executing = false;
            state.last_result = Some(result.clone());
            state.updated_at = Some(Utc::now());
        }
        self.notify(StateChange::Finished {
            tool: tool.to_string(),
            success: result.success,
            duration_ms,
        });
    }

    // The write guard is released before listeners run so they can read state.
    fn notify(&self, change: StateChange) {
        let snapshot = self.snapshot();

        // Collect first: a listener may subscribe or unsubscribe while running.
        let listeners: Vec<(u64, Listener)> = self
            .listeners
            .iter()
            .map(|l| (*l.key(), Arc::clone(l.value())))
            .collect();
        for (id, listener) in listeners {
            // A panicking listener must not abort the dispatch or skip the others
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&snapshot)));
            if let Err(panic) = outcome {
                warn!(
                    target: "execution_state",
                    subscription = id,
                    error = %panic_message(panic.as_ref()),
                    "Listener panicked"
                );
            }
        }

        if self.events_tx.receiver_count() > 0 && self.events_tx.send(change).is_err() {
            warn!(target: "execution_state", "State change dropped, no receivers");
        }
    }
}
