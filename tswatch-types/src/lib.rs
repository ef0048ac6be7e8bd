//! # tswatch-types
//!
//! Core types shared by the tswatch crates: the [`Snapshot`] the coordinator
//! publishes, the loosely-typed [`Record`] maps the WebQuery protocol returns,
//! and tolerant field accessors for code that renders derived metrics.
//!
//! ## Example
//!
//! ```rust
//! use tswatch_types::{fields, Record, Snapshot};
//!
//! let mut server_info = Record::new();
//! server_info.insert(fields::CLIENTS_ONLINE.to_string(), "5".into());
//!
//! let snapshot = Snapshot::builder()
//!     .timestamp_ms(1703160000000)
//!     .server_info(server_info)
//!     .build();
//!
//! // Values are stored verbatim; coercion happens on read.
//! assert_eq!(snapshot.server_info[fields::CLIENTS_ONLINE], "5");
//! assert_eq!(fields::integer(&snapshot.server_info, fields::CLIENTS_ONLINE), Some(5));
//! ```

pub mod fields;
mod snapshot;

pub use snapshot::*;
