//! Republishes host diagnostics as discrete events to subscribers.

use crate::diagnostic::HostDiagnostic;
use crate::host::{DiagnosticHost, HandlerId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An event emitted by an [`ErrorRelay`] for each host diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayEvent {
    /// The host raised an error (any kind other than a warning).
    ErrorReceived(HostDiagnostic),
    /// The host raised a warning.
    WarningReceived(HostDiagnostic),
}

impl RelayEvent {
    fn classify(diag: &HostDiagnostic) -> Self {
        if diag.kind.is_warning() {
            RelayEvent::WarningReceived(diag.clone())
        } else {
            RelayEvent::ErrorReceived(diag.clone())
        }
    }

    /// Returns the diagnostic carried by this event.
    pub fn diagnostic(&self) -> &HostDiagnostic {
        match self {
            RelayEvent::ErrorReceived(d) | RelayEvent::WarningReceived(d) => d,
        }
    }

    /// Returns `true` for [`WarningReceived`](RelayEvent::WarningReceived).
    pub fn is_warning(&self) -> bool {
        matches!(self, RelayEvent::WarningReceived(_))
    }
}

/// Identifies a subscription to an [`ErrorRelay`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionId(u64);

enum Subscriber {
    Callback(Arc<dyn Fn(&RelayEvent) + Send + Sync>),
    Channel(flume::Sender<RelayEvent>),
}

#[derive(Default)]
struct Subscribers {
    entries: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
}

impl Subscribers {
    fn insert(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, subscriber));
        id
    }

    fn publish(&self, event: &RelayEvent) {
        let mut callbacks = Vec::new();
        {
            let mut entries = self.entries.lock();
            // Channels whose receiver was dropped unsubscribe themselves.
            entries.retain(|(_, sub)| match sub {
                Subscriber::Channel(tx) => tx.send(event.clone()).is_ok(),
                Subscriber::Callback(cb) => {
                    callbacks.push(Arc::clone(cb));
                    true
                }
            });
        }
        for cb in callbacks {
            cb(event);
        }
    }
}

/// Forwards every diagnostic reported to a [`DiagnosticHost`] as a [`RelayEvent`].
///
/// The relay registers its handler when attached and removes it when dropped,
/// so the host never calls into a relay that no longer exists. Subscribers are
/// independent of the host: subscribing or unsubscribing never touches the
/// host's handler list.
pub struct ErrorRelay<'h> {
    host: &'h DiagnosticHost,
    handler: HandlerId,
    subscribers: Arc<Subscribers>,
}

impl<'h> ErrorRelay<'h> {
    /// Registers a relay with `host`.
    pub fn attach(host: &'h DiagnosticHost) -> Self {
        let subscribers = Arc::new(Subscribers::default());
        let sink = Arc::clone(&subscribers);
        let handler = host.add_handler(Arc::new(move |diag: &HostDiagnostic| {
            sink.publish(&RelayEvent::classify(diag));
        }));
        tracing::trace!(?handler, "error relay attached");
        Self {
            host,
            handler,
            subscribers,
        }
    }

    /// Registers a callback invoked for every relayed event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RelayEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .insert(Subscriber::Callback(Arc::new(callback)))
    }

    /// Returns a receiver that gets a copy of every relayed event.
    ///
    /// Dropping the receiver ends the subscription on the next event.
    pub fn channel(&self) -> flume::Receiver<RelayEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.insert(Subscriber::Channel(tx));
        rx
    }

    /// Removes a subscription. Returns `false` if it was not present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.subscribers.entries.lock();
        let before = entries.len();
        entries.retain(|(sid, _)| *sid != id);
        entries.len() != before
    }

    /// Returns the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.entries.lock().len()
    }
}

impl Drop for ErrorRelay<'_> {
    fn drop(&mut self) {
        self.host.remove_handler(self.handler);
        tracing::trace!(handler = ?self.handler, "error relay detached");
    }
}
