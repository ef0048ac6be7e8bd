//! # tswatch-webquery
//!
//! Request/response client for the TeamSpeak WebQuery HTTP API.
//!
//! Each logical query ("server info", "client list", "channel list") becomes
//! exactly one `POST http://{host}:{port}/{server_id}/{endpoint}?api-key=...`
//! on a session shared for the lifetime of the client. Responses are checked
//! for a zero status code and failures are classified into two kinds:
//!
//! - [`QueryError::Auth`] - the server rejected the API key (code 3329)
//! - [`QueryError::Connect`] - anything else: transport errors, timeouts,
//!   malformed envelopes, other non-zero codes, an empty server info body
//!
//! The client never retries. Scheduling and retry belong to the coordinator.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tswatch_webquery::{QueryError, WebQueryClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WebQueryClient::builder()
//!         .host("ts.example.com")
//!         .api_key("abc")
//!         .build()?;
//!
//!     match client.test_connection().await {
//!         Ok(info) => println!("connected: {:?}", info.get("virtualserver_name")),
//!         Err(QueryError::Auth(_)) => println!("bad API key"),
//!         Err(QueryError::Connect(msg)) => println!("unreachable: {}", msg),
//!     }
//!     Ok(())
//! }
//! ```

mod client;
pub mod envelope;
pub mod error;
mod query;

pub use client::{
    endpoint, ConnectionDescriptor, WebQueryClient, WebQueryClientBuilder, DEFAULT_PORT,
    DEFAULT_SERVER_ID, DEFAULT_TIMEOUT,
};
pub use error::{QueryError, INVALID_API_KEY};
pub use query::ServerQuery;

// Re-export types for convenience
pub use tswatch_types::{Record, Snapshot};
