//! The polling coordinator.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use tswatch_types::Snapshot;
use tswatch_webquery::{QueryError, ServerQuery};

use crate::state::{SharedState, Status};
use crate::subscribers::{Subscribers, SubscriptionId, Update};
use crate::RefreshError;

/// Default refresh interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest refresh interval accepted; shorter values are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(5);

/// Owns the refresh schedule and the single current snapshot.
///
/// A coordinator wraps one [`ServerQuery`] (normally a
/// [`tswatch_webquery::WebQueryClient`] and its session) for its whole
/// lifetime. Refreshes are single-flight: a trigger that arrives while a
/// cycle is running waits for it and shares its outcome.
///
/// Cloning is cheap; clones share the same state, session and subscribers.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tswatch_coordinator::{Coordinator, Update};
/// use tswatch_webquery::WebQueryClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = WebQueryClient::builder()
///         .host("ts.example.com")
///         .api_key("abc")
///         .build()?;
///
///     let coordinator = Coordinator::builder(client)
///         .interval(Duration::from_secs(30))
///         .build();
///
///     coordinator.subscribe(|update| {
///         if let Update::Fresh(snapshot) = update {
///             println!("{} clients", snapshot.client_count());
///         }
///     });
///
///     // Setup is not finished until one refresh has succeeded.
///     coordinator.first_refresh().await?;
///
///     let handle = coordinator.start();
///     tokio::time::sleep(Duration::from_secs(120)).await;
///     handle.stop();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Coordinator<Q> {
    inner: Arc<Inner<Q>>,
}

impl<Q> Clone for Coordinator<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[derive(Debug)]
struct Inner<Q> {
    name: String,
    interval: Duration,
    query: Q,
    state: SharedState,
    subscribers: Subscribers,
    /// Held for the duration of a refresh cycle.
    in_flight: Mutex<()>,
    /// Set while the three queries run; cleared before subscribers are told.
    fetching: AtomicBool,
    /// Number of completed cycles.
    generation: AtomicU64,
}

impl<Q: ServerQuery> Coordinator<Q> {
    /// Create a coordinator with default settings.
    pub fn new(query: Q) -> Self {
        Self::builder(query).build()
    }

    /// Create a builder for configuring the coordinator.
    pub fn builder(query: Q) -> CoordinatorBuilder<Q> {
        CoordinatorBuilder::new(query)
    }

    /// The coordinator's display name, used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The scheduled refresh interval.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// The wrapped query implementation.
    pub fn query(&self) -> &Q {
        &self.inner.query
    }

    /// The latest successfully fetched snapshot, if any.
    ///
    /// Call this each time the data is needed rather than caching the result;
    /// the coordinator swaps in a new `Arc` after every successful cycle.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.inner.state.current()
    }

    /// Current coordinator status.
    pub fn status(&self) -> Status {
        if self.inner.fetching.load(Ordering::Acquire) {
            return Status::Refreshing;
        }
        self.inner.state.status()
    }

    /// The error from the last cycle, if it failed.
    pub fn last_error(&self) -> Option<RefreshError> {
        self.inner.state.last_error()
    }

    /// Register a callback invoked after every refresh cycle.
    ///
    /// Callbacks run on the task that performed the refresh and should not block.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Update) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(Arc::new(callback))
    }

    /// Remove a previously registered callback.
    ///
    /// Returns `true` if the callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    /// A watch receiver that always holds the most recent update.
    ///
    /// Holds `None` until the first cycle completes.
    pub fn watch(&self) -> watch::Receiver<Option<Update>> {
        self.inner.subscribers.watch()
    }

    /// Run a refresh cycle, or join the one already in flight.
    ///
    /// Never panics and never lets a query error escape unclassified. On
    /// failure the previously stored snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let seen = self.inner.generation.load(Ordering::Acquire);
        let _flight = self.inner.in_flight.lock().await;

        // A cycle completed while we waited for the lock: share its outcome.
        if self.inner.generation.load(Ordering::Acquire) != seen {
            if let Some(outcome) = self.inner.state.last_outcome() {
                debug!(coordinator = %self.inner.name, "Joined in-flight refresh");
                return outcome;
            }
        }

        let outcome = self.run_cycle().await;
        self.inner.generation.fetch_add(1, Ordering::Release);
        outcome
    }

    /// The refresh the host performs during setup.
    ///
    /// Setup should not be considered complete unless this returns `Ok`.
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let snapshot = self.refresh().await?;
        info!(
            coordinator = %self.inner.name,
            clients = snapshot.client_count(),
            channels = snapshot.channel_count(),
            "Initial refresh complete"
        );
        Ok(snapshot)
    }

    async fn run_cycle(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let fetching = Fetching::enter(&self.inner.fetching);
        let fetched = self.fetch().await;

        match fetched {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.inner.state.publish(snapshot.clone());
                drop(fetching);
                debug!(
                    coordinator = %self.inner.name,
                    clients = snapshot.client_count(),
                    channels = snapshot.channel_count(),
                    "Refresh succeeded"
                );
                self.inner.subscribers.notify(Update::Fresh(snapshot.clone()));
                Ok(snapshot)
            }
            Err(err) => {
                let err = RefreshError::from(err);
                self.inner.state.fail(err.clone());
                drop(fetching);
                match &err {
                    RefreshError::AuthFailed(msg) => {
                        error!(coordinator = %self.inner.name, "Authentication failed: {}", msg);
                        self.inner.subscribers.notify(Update::AuthFailed(msg.clone()));
                    }
                    RefreshError::UpdateFailed(msg) => {
                        warn!(coordinator = %self.inner.name, "Refresh failed: {}", msg);
                        self.inner.subscribers.notify(Update::Stale(msg.clone()));
                    }
                }
                Err(err)
            }
        }
    }

    /// The three queries, strictly one after another on the shared session.
    async fn fetch(&self) -> Result<Snapshot, QueryError> {
        let query = &self.inner.query;
        let server_info = query.server_info().await?;
        let client_list = query.client_list().await?;
        let channel_list = query.channel_list().await?;
        Ok(Snapshot::new(server_info, client_list, channel_list))
    }
}

/// Marks a fetch in progress. Clears the flag on drop, so a cancelled
/// refresh never leaves the coordinator reporting `Refreshing`.
struct Fetching<'a>(&'a AtomicBool);

impl<'a> Fetching<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for Fetching<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<Q: ServerQuery + 'static> Coordinator<Q> {
    /// Start scheduled refreshes on the tokio runtime.
    ///
    /// The first scheduled refresh happens one interval from now; call
    /// [`Coordinator::first_refresh`] beforehand for immediate data. The
    /// schedule ends when the handle is stopped or dropped, or after an
    /// authentication failure.
    pub fn start(&self) -> PollingHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let coordinator = self.clone();
        let interval = self.inner.interval;

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if let Err(RefreshError::AuthFailed(_)) = coordinator.refresh().await {
                            warn!(
                                coordinator = %coordinator.inner.name,
                                "Scheduled refresh disabled until credentials are fixed"
                            );
                            break;
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(coordinator = %coordinator.inner.name, "Polling stopped");
        });

        PollingHandle { stop_tx, task }
    }
}

/// Builder for configuring a Coordinator.
#[derive(Debug)]
pub struct CoordinatorBuilder<Q> {
    query: Q,
    name: Option<String>,
    interval: Option<Duration>,
}

impl<Q: ServerQuery> CoordinatorBuilder<Q> {
    /// Create a new builder around a query implementation.
    pub fn new(query: Q) -> Self {
        Self {
            query,
            name: None,
            interval: None,
        }
    }

    /// Set the name used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the refresh interval.
    ///
    /// Defaults to 60 seconds. Values below 5 seconds are raised to 5.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Build the coordinator.
    pub fn build(self) -> Coordinator<Q> {
        let mut interval = self.interval.unwrap_or(DEFAULT_INTERVAL);
        if interval < MIN_INTERVAL {
            warn!(
                requested = ?interval,
                "Refresh interval below minimum, using {:?}",
                MIN_INTERVAL
            );
            interval = MIN_INTERVAL;
        }

        Coordinator {
            inner: Arc::new(Inner {
                name: self
                    .name
                    .unwrap_or_else(|| "TeamSpeak Server Info".to_string()),
                interval,
                query: self.query,
                state: SharedState::default(),
                subscribers: Subscribers::default(),
                in_flight: Mutex::new(()),
                fetching: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }
}

/// Handle for controlling scheduled refreshes.
///
/// Drop this handle to stop polling, or call `stop()` explicitly.
#[derive(Debug)]
pub struct PollingHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl PollingHandle {
    /// Stop scheduled refreshes. A cycle already in flight runs to completion.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop and wait for the polling task to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }

    /// Returns true once the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
