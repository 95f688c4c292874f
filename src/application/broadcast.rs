//! Subprocess output fan-out.
//!
//! Every attached observer receives every broadcast chunk, in broadcast
//! order. Channel observers detach automatically once their receiving end
//! is dropped; callback observers stay attached until [`LogBroadcaster::detach`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::port::LogSink;

/// Identifier of an attached observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

enum Target {
    Channel(mpsc::UnboundedSender<String>),
    Sink(Arc<dyn LogSink>),
}

struct Subscriber {
    id: ObserverId,
    target: Target,
}

/// Receiving end of a channel observer.
///
/// Dropping it detaches the observer on the next broadcast.
pub struct Observer {
    id: ObserverId,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Observer {
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Wait for the next chunk. Returns `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take the next chunk if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Take every chunk queued so far.
    pub fn drain(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Fan-out sink forwarding subprocess output to all attached observers.
#[derive(Default)]
pub struct LogBroadcaster {
    next_id: AtomicU64,
    observers: Mutex<Vec<Subscriber>>,
}

impl LogBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ObserverId {
        ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Attach a channel observer.
    pub fn attach(&self) -> Observer {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id();
        self.observers.lock().push(Subscriber {
            id,
            target: Target::Channel(tx),
        });
        debug!(observer = %id, "observer attached");
        Observer { id, rx }
    }

    /// Attach a callback observer.
    ///
    /// The sink is called while the broadcaster's lock is held and must not
    /// call back into the broadcaster.
    pub fn attach_sink(&self, sink: Arc<dyn LogSink>) -> ObserverId {
        let id = self.next_id();
        self.observers.lock().push(Subscriber {
            id,
            target: Target::Sink(sink),
        });
        debug!(observer = %id, "sink attached");
        id
    }

    /// Detach an observer. Returns `false` if it was not attached.
    pub fn detach(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|sub| sub.id != id);
        before != observers.len()
    }

    /// Deliver a chunk to every attached observer.
    ///
    /// Delivery is best-effort: a closed channel is detached and a panicking
    /// sink is skipped for this chunk; neither affects other observers.
    pub fn broadcast(&self, chunk: &str) {
        let mut observers = self.observers.lock();
        observers.retain(|sub| match &sub.target {
            Target::Channel(tx) => {
                if tx.send(chunk.to_owned()).is_err() {
                    debug!(observer = %sub.id, "observer closed, detaching");
                    return false;
                }
                true
            }
            Target::Sink(sink) => {
                if panic::catch_unwind(AssertUnwindSafe(|| sink.emit(chunk))).is_err() {
                    warn!(observer = %sub.id, "observer panicked during delivery");
                }
                true
            }
        });
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}

impl LogSink for LogBroadcaster {
    fn emit(&self, chunk: &str) {
        self.broadcast(chunk);
    }
}
