//! Snapshot - the latest successfully fetched view of a virtual server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One flat key/value map from a WebQuery `body` array.
///
/// Values are kept exactly as the server sent them (usually strings, sometimes
/// numbers). See [`crate::fields`] for coercing helpers.
pub type Record = BTreeMap<String, Value>;

/// A point-in-time snapshot of a TeamSpeak virtual server.
///
/// A snapshot is only ever built from a refresh cycle in which all three
/// queries succeeded. It is never mutated after construction; the coordinator
/// replaces it wholesale.
///
/// # Example
///
/// ```rust
/// use tswatch_types::{Record, Snapshot};
///
/// let snapshot = Snapshot::builder()
///     .server_info(Record::new())
///     .client(Record::new())
///     .build();
///
/// assert_eq!(snapshot.client_count(), 1);
/// assert_eq!(snapshot.channel_count(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix timestamp in milliseconds when the refresh cycle completed.
    pub timestamp_ms: u64,

    /// First element of the `serverinfo` response.
    pub server_info: Record,

    /// Body of the `clientlist` response, in server order.
    pub client_list: Vec<Record>,

    /// Body of the `channellist` response, in server order.
    pub channel_list: Vec<Record>,
}

impl Snapshot {
    /// Assemble a snapshot from the three query results, stamped with the current time.
    pub fn new(server_info: Record, client_list: Vec<Record>, channel_list: Vec<Record>) -> Self {
        Self {
            timestamp_ms: current_timestamp_ms(),
            server_info,
            client_list,
            channel_list,
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Number of entries in the client list (query clients included).
    pub fn client_count(&self) -> usize {
        self.client_list.len()
    }

    /// Number of entries in the channel list.
    pub fn channel_count(&self) -> usize {
        self.channel_list.len()
    }

    /// Look up a raw server-info field.
    pub fn server_field(&self, key: &str) -> Option<&Value> {
        self.server_info.get(key)
    }
}

/// Builder for constructing `Snapshot` instances, mostly in tests and fixtures.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    timestamp_ms: Option<u64>,
    server_info: Record,
    client_list: Vec<Record>,
    channel_list: Vec<Record>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Set the server-info record.
    pub fn server_info(mut self, record: Record) -> Self {
        self.server_info = record;
        self
    }

    /// Set a single server-info field.
    pub fn server_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.server_info.insert(key.into(), value.into());
        self
    }

    /// Append a client record.
    pub fn client(mut self, record: Record) -> Self {
        self.client_list.push(record);
        self
    }

    /// Append a channel record.
    pub fn channel(mut self, record: Record) -> Self {
        self.channel_list.push(record);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            server_info: self.server_info,
            client_list: self.client_list,
            channel_list: self.channel_list,
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_snapshot_builder() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1703160000000)
            .server_field("virtualserver_name", "Lobby")
            .client(record(&[("clid", json!("1"))]))
            .client(record(&[("clid", json!("2"))]))
            .channel(record(&[("cid", json!("1"))]))
            .build();

        assert_eq!(snapshot.timestamp_ms, 1703160000000);
        assert_eq!(snapshot.client_count(), 2);
        assert_eq!(snapshot.channel_count(), 1);
        assert_eq!(snapshot.server_field("virtualserver_name"), Some(&json!("Lobby")));
    }

    #[test]
    fn new_keeps_payload_verbatim() {
        let info = record(&[
            ("virtualserver_clientsonline", json!("5")),
            ("virtualserver_maxclients", json!(32)),
        ]);
        let clients = vec![record(&[("client_nickname", json!("alice"))])];

        let snapshot = Snapshot::new(info.clone(), clients.clone(), Vec::new());

        assert_eq!(snapshot.server_info, info);
        assert_eq!(snapshot.client_list, clients);
        assert!(snapshot.channel_list.is_empty());
        assert!(snapshot.timestamp_ms > 0);
    }

    #[test]
    fn missing_field_is_none() {
        let snapshot = Snapshot::builder().build();
        assert_eq!(snapshot.server_field("virtualserver_uptime"), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1703160000000)
            .server_field("virtualserver_uptime", "3600")
            .channel(record(&[("channel_name", json!("Default Channel"))]))
            .build();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, parsed);
    }
}
