//! # tswatch
//!
//! Command-line monitor for a TeamSpeak virtual server over the WebQuery
//! HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌─────────────┐    ┌───────────────┐    ┌─────────┐
//! │ settings │───▶│ WebQuery    │───▶│ Coordinator   │───▶│ sensors │
//! │ (config) │    │ client      │    │ (snapshot)    │    │ (print) │
//! └──────────┘    └─────────────┘    └───────────────┘    └─────────┘
//!                        │
//!                        ▼
//!                 ┌─────────────┐
//!                 │ setup       │ validate + registry
//!                 └─────────────┘
//! ```
//!
//! - **[`settings`]**: connection settings from defaults, a TOML file,
//!   `TSWATCH_*` variables and flags
//! - **[`setup`]**: one-shot validation of settings and the registry of
//!   configured servers
//! - **[`sensors`]**: derived metrics read out of a snapshot
//! - **[`monitor`]**: printing readings as snapshots arrive, and JSON export
//!
//! ## Usage
//!
//! ```bash
//! # Check settings and record the server
//! tswatch --host ts.example.com --api-key abc validate --registry servers.json
//!
//! # Print sensors every 60 seconds
//! tswatch --config tswatch.toml run
//!
//! # Dump one snapshot
//! tswatch --config tswatch.toml export snapshot.json
//! ```

pub mod monitor;
pub mod sensors;
pub mod settings;
pub mod setup;

pub use monitor::{connect, export, follow, format_snapshot, OutputFormat};
pub use sensors::{device_info, readings, DeviceInfo, Reading, SensorValue};
pub use settings::{Overrides, Settings};
pub use setup::{
    identify, validate_input, validate_server, Registry, RegistryEntry, ServerIdentity, SetupError,
    Validated,
};
