//! Well-known WebQuery field names and tolerant accessors.
//!
//! The server reports almost everything as strings. Consumers that need
//! numbers go through [`integer`], which treats absent or unparseable values
//! as unknown rather than failing.

use serde_json::Value;

use crate::Record;

pub const SERVER_NAME: &str = "virtualserver_name";
pub const SERVER_VERSION: &str = "virtualserver_version";
pub const SERVER_PLATFORM: &str = "virtualserver_platform";
pub const SERVER_PORT: &str = "virtualserver_port";
pub const SERVER_STATUS: &str = "virtualserver_status";
pub const SERVER_UNIQUE_ID: &str = "virtualserver_unique_identifier";

pub const CLIENTS_ONLINE: &str = "virtualserver_clientsonline";
pub const QUERY_CLIENTS_ONLINE: &str = "virtualserver_queryclientsonline";
pub const CHANNELS_ONLINE: &str = "virtualserver_channelsonline";
pub const MAX_CLIENTS: &str = "virtualserver_maxclients";
pub const UPTIME: &str = "virtualserver_uptime";

pub const BANDWIDTH_RECEIVED_LAST_SECOND: &str = "connection_bandwidth_received_last_second_total";
pub const BANDWIDTH_SENT_LAST_SECOND: &str = "connection_bandwidth_sent_last_second_total";
pub const BANDWIDTH_RECEIVED_LAST_MINUTE: &str = "connection_bandwidth_received_last_minute_total";
pub const BANDWIDTH_SENT_LAST_MINUTE: &str = "connection_bandwidth_sent_last_minute_total";
pub const BYTES_RECEIVED_TOTAL: &str = "connection_bytes_received_total";
pub const BYTES_SENT_TOTAL: &str = "connection_bytes_sent_total";

/// Read a field as text. Numbers are not stringified; only JSON strings match.
pub fn text<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Read a field as an integer, accepting JSON numbers and numeric strings.
///
/// Fractional values are truncated toward zero, matching how the server's
/// bandwidth counters are usually displayed.
pub fn integer(record: &Record, key: &str) -> Option<i64> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

/// Like [`integer`], but an absent or unparseable field reads as zero.
///
/// Used for secondary totals where "unknown" and "none yet" display the same.
pub fn integer_or_zero(record: &Record, key: &str) -> i64 {
    integer(record, key).unwrap_or(0)
}
