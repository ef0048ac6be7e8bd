//! Observer registration and notification.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tswatch_types::Snapshot;

/// What subscribers are told after each refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// A new snapshot replaced the previous one.
    Fresh(Arc<Snapshot>),
    /// The cycle failed transiently. The last good snapshot, if any, may be stale.
    Stale(String),
    /// The API key was rejected. Scheduled polling has stopped.
    AuthFailed(String),
}

/// Identifies a registered callback so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&Update) + Send + Sync>;

/// Callback list plus a watch channel for async consumers.
pub(crate) struct Subscribers {
    callbacks: RwLock<BTreeMap<SubscriptionId, Callback>>,
    next_id: AtomicU64,
    watch_tx: watch::Sender<Option<Update>>,
}

impl Default for Subscribers {
    fn default() -> Self {
        let (watch_tx, _) = watch::channel(None);
        Self {
            callbacks: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            watch_tx,
        }
    }
}

impl Subscribers {
    pub fn subscribe(&self, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.write().insert(id, callback);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Update>> {
        self.watch_tx.subscribe()
    }

    /// Deliver an update to every callback and to watch receivers.
    ///
    /// Callbacks run outside the registry lock, so a callback may subscribe
    /// or unsubscribe.
    pub fn notify(&self, update: Update) {
        let callbacks: Vec<Callback> = self.callbacks.read().values().cloned().collect();

        for callback in callbacks {
            callback(&update);
        }

        self.watch_tx.send_replace(Some(update));
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("callbacks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Callback, Arc<Mutex<Vec<Update>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: Callback = Arc::new(move |u: &Update| sink.lock().unwrap().push(u.clone()));
        (cb, seen)
    }

    #[test]
    fn notify_reaches_all_callbacks() {
        let subs = Subscribers::default();
        let (a, seen_a) = recorder();
        let (b, seen_b) = recorder();
        subs.subscribe(a);
        subs.subscribe(b);

        subs.notify(Update::Stale("timeout".to_string()));

        assert_eq!(*seen_a.lock().unwrap(), vec![Update::Stale("timeout".to_string())]);
        assert_eq!(*seen_b.lock().unwrap(), vec![Update::Stale("timeout".to_string())]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let subs = Subscribers::default();
        let (cb, seen) = recorder();
        let id = subs.subscribe(cb);

        assert!(subs.unsubscribe(id));
        assert!(!subs.unsubscribe(id));

        subs.notify(Update::AuthFailed("invalid apikey".to_string()));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn watch_sees_latest_update() {
        let subs = Subscribers::default();
        let rx = subs.watch();
        assert!(rx.borrow().is_none());

        subs.notify(Update::Stale("first".to_string()));
        subs.notify(Update::Stale("second".to_string()));

        assert_eq!(*rx.borrow(), Some(Update::Stale("second".to_string())));
    }
}
