//! # tswatch-coordinator
//!
//! Periodic polling for a TeamSpeak virtual server. A [`Coordinator`] owns
//! the refresh schedule, runs the three WebQuery calls of a refresh cycle
//! strictly in sequence, and publishes the result as one immutable
//! [`Snapshot`] to registered subscribers.
//!
//! ## Refresh cycle
//!
//! 1. `serverinfo`, then `clientlist`, then `channellist`, one at a time
//! 2. Any authentication failure aborts the cycle, notifies
//!    [`Update::AuthFailed`] and stops scheduled polling
//! 3. Any connectivity failure aborts the cycle and notifies
//!    [`Update::Stale`]; the next tick tries again
//! 4. Otherwise the new snapshot replaces the old one and subscribers get
//!    [`Update::Fresh`]
//!
//! A failed cycle never changes the stored snapshot, and overlapping triggers
//! share a single in-flight cycle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tswatch_coordinator::Coordinator;
//! use tswatch_webquery::WebQueryClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WebQueryClient::builder()
//!         .host("ts.example.com")
//!         .api_key("abc")
//!         .build()?;
//!     let coordinator = Coordinator::new(client);
//!
//!     coordinator.first_refresh().await?;
//!     let _polling = coordinator.start();
//!
//!     if let Some(snapshot) = coordinator.current() {
//!         println!("{} channels", snapshot.channel_count());
//!     }
//!     Ok(())
//! }
//! ```

mod coordinator;
mod error;
mod state;
mod subscribers;

pub use coordinator::{
    Coordinator, CoordinatorBuilder, PollingHandle, DEFAULT_INTERVAL, MIN_INTERVAL,
};
pub use error::RefreshError;
pub use state::Status;
pub use subscribers::{SubscriptionId, Update};

// Re-export types for convenience
pub use tswatch_types::{Record, Snapshot};
