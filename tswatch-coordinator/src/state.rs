//! Shared state owned by a coordinator.

use std::sync::Arc;

use parking_lot::RwLock;
use tswatch_types::Snapshot;

use crate::RefreshError;

/// Where the coordinator stands after its most recent refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No cycle has completed yet.
    Idle,
    /// A cycle is in flight.
    Refreshing,
    /// The last cycle succeeded.
    Fresh,
    /// The last cycle failed transiently. Any previous snapshot is still served.
    Stale,
    /// The last cycle was rejected for bad credentials.
    AuthFailed,
}

impl Status {
    /// Returns a string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Refreshing => "refreshing",
            Status::Fresh => "fresh",
            Status::Stale => "stale",
            Status::AuthFailed => "auth_failed",
        }
    }
}

/// The current snapshot plus the outcome of the last settled cycle.
///
/// The snapshot is swapped as a whole `Arc`; readers never observe a
/// half-built value.
#[derive(Debug)]
pub(crate) struct SharedState {
    current: RwLock<Option<Arc<Snapshot>>>,
    settled: RwLock<Settled>,
}

#[derive(Debug)]
struct Settled {
    status: Status,
    last_error: Option<RefreshError>,
    last_outcome: Option<Result<Arc<Snapshot>, RefreshError>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            current: RwLock::new(None),
            settled: RwLock::new(Settled {
                status: Status::Idle,
                last_error: None,
                last_outcome: None,
            }),
        }
    }
}

impl SharedState {
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    pub fn status(&self) -> Status {
        self.settled.read().status
    }

    pub fn last_error(&self) -> Option<RefreshError> {
        self.settled.read().last_error.clone()
    }

    pub fn last_outcome(&self) -> Option<Result<Arc<Snapshot>, RefreshError>> {
        self.settled.read().last_outcome.clone()
    }

    /// Install a new snapshot and mark the cycle fresh.
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.current.write() = Some(snapshot.clone());
        let mut settled = self.settled.write();
        settled.status = Status::Fresh;
        settled.last_error = None;
        settled.last_outcome = Some(Ok(snapshot));
    }

    /// Record a failed cycle. The current snapshot is left alone.
    pub fn fail(&self, err: RefreshError) {
        let mut settled = self.settled.write();
        settled.status = if err.is_auth() {
            Status::AuthFailed
        } else {
            Status::Stale
        };
        settled.last_error = Some(err.clone());
        settled.last_outcome = Some(Err(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_empty() {
        let state = SharedState::default();
        assert_eq!(state.status(), Status::Idle);
        assert!(state.current().is_none());
        assert!(state.last_error().is_none());
        assert!(state.last_outcome().is_none());
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let state = SharedState::default();
        let snapshot = Arc::new(Snapshot::builder().timestamp_ms(1).build());
        state.publish(snapshot.clone());

        state.fail(RefreshError::UpdateFailed("timeout".to_string()));

        assert_eq!(state.status(), Status::Stale);
        assert!(Arc::ptr_eq(&state.current().unwrap(), &snapshot));
        assert_eq!(
            state.last_error(),
            Some(RefreshError::UpdateFailed("timeout".to_string()))
        );
    }

    #[test]
    fn publish_clears_error() {
        let state = SharedState::default();
        state.fail(RefreshError::AuthFailed("invalid apikey".to_string()));
        assert_eq!(state.status(), Status::AuthFailed);

        state.publish(Arc::new(Snapshot::builder().build()));
        assert_eq!(state.status(), Status::Fresh);
        assert!(state.last_error().is_none());
    }

    #[test]
    fn status_strings() {
        assert_eq!(Status::Fresh.as_str(), "fresh");
        assert_eq!(Status::AuthFailed.as_str(), "auth_failed");
    }
}
