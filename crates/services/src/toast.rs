//! Toast notifications: short-lived messages with auto-expiry.
//!
//! The queue is a cheap clonable handle. Each pushed toast gets its own
//! expiry task; dismissing a toast early aborts that task. Ids come from a
//! monotonic counter and are never reused, so an expiry that races with a
//! dismissal can only ever target its own toast.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ToastId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ToastId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub text: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Expired,
    Dismissed,
}

/// Change notification for views that redraw on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum ToastEvent {
    Shown(Toast),
    Removed { id: ToastId, reason: RemovalReason },
}

struct Inner {
    next_id: u64,
    toasts: Vec<Toast>,
    timers: HashMap<ToastId, JoinHandle<()>>,
}

#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<Mutex<Inner>>,
    default_ttl: Duration,
    events: broadcast::Sender<ToastEvent>,
}

impl ToastQueue {
    pub fn new(default_ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                toasts: Vec::new(),
                timers: HashMap::new(),
            })),
            default_ttl,
            events,
        }
    }

    /// Append a toast with the default ttl.
    ///
    /// Must be called from within a Tokio runtime: the expiry is a spawned task.
    pub fn push(&self, text: impl Into<String>, severity: Severity) -> ToastId {
        self.push_with_ttl(text, severity, self.default_ttl)
    }

    pub fn push_with_ttl(
        &self,
        text: impl Into<String>,
        severity: Severity,
        ttl: Duration,
    ) -> ToastId {
        let mut inner = self.inner.lock();
        let id = ToastId(inner.next_id);
        inner.next_id += 1;

        let toast = Toast {
            id,
            text: text.into(),
            severity,
            created_at: Utc::now(),
            ttl,
        };
        tracing::debug!(%id, ?severity, text = %toast.text, "toast");
        inner.toasts.push(toast.clone());

        // Inserted under the lock, so the expiry task cannot observe the
        // toast without its timer entry.
        let queue = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            queue.remove(id, RemovalReason::Expired);
        });
        inner.timers.insert(id, timer);
        drop(inner);

        let _ = self.events.send(ToastEvent::Shown(toast));
        id
    }

    pub fn success(&self, text: impl Into<String>) -> ToastId {
        self.push(text, Severity::Success)
    }

    pub fn error(&self, text: impl Into<String>) -> ToastId {
        self.push(text, Severity::Error)
    }

    pub fn info(&self, text: impl Into<String>) -> ToastId {
        self.push(text, Severity::Info)
    }

    pub fn warning(&self, text: impl Into<String>) -> ToastId {
        self.push(text, Severity::Warning)
    }

    /// Remove a toast now. Returns false if it was already gone.
    pub fn dismiss(&self, id: ToastId) -> bool {
        self.remove(id, RemovalReason::Dismissed)
    }

    fn remove(&self, id: ToastId, reason: RemovalReason) -> bool {
        let mut inner = self.inner.lock();
        let Some(pos) = inner.toasts.iter().position(|t| t.id == id) else {
            return false;
        };
        inner.toasts.remove(pos);
        if let Some(timer) = inner.timers.remove(&id) {
            if reason == RemovalReason::Dismissed {
                timer.abort();
            }
        }
        drop(inner);

        let _ = self.events.send(ToastEvent::Removed { id, reason });
        true
    }

    /// Live toasts in insertion order.
    pub fn list(&self) -> Vec<Toast> {
        self.inner.lock().toasts.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().toasts.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ToastEvent> {
        self.events.subscribe()
    }
}

impl fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastQueue")
            .field("toasts", &self.list())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
