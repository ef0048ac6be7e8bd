//! Derived metrics read out of the current snapshot.
//!
//! Each sensor turns one server-info field into a value plus a few related
//! attributes. An absent or unparseable field reads as unknown.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{json, Value};
use tswatch_types::{fields, Snapshot};
use tswatch_webquery::ConnectionDescriptor;

/// A sensor's current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Integer(i64),
    Text(String),
}

impl std::fmt::Display for SensorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorValue::Integer(n) => write!(f, "{}", n),
            SensorValue::Text(s) => f.write_str(s),
        }
    }
}

/// One sensor evaluated against a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub key: &'static str,
    pub unit: Option<&'static str>,
    pub value: Option<SensorValue>,
    pub attributes: BTreeMap<&'static str, Value>,
}

struct SensorDescription {
    key: &'static str,
    unit: Option<&'static str>,
    value: fn(&Snapshot) -> Option<SensorValue>,
    attributes: fn(&Snapshot) -> BTreeMap<&'static str, Value>,
}

fn integer_field(snapshot: &Snapshot, key: &str) -> Option<SensorValue> {
    fields::integer(&snapshot.server_info, key).map(SensorValue::Integer)
}

fn text_field(snapshot: &Snapshot, key: &str) -> Value {
    snapshot.server_field(key).cloned().unwrap_or(Value::Null)
}

fn no_attributes(_: &Snapshot) -> BTreeMap<&'static str, Value> {
    BTreeMap::new()
}

fn bandwidth_attributes(
    snapshot: &Snapshot,
    total_key: &str,
    minute_key: &str,
) -> BTreeMap<&'static str, Value> {
    let info = &snapshot.server_info;
    BTreeMap::from([
        ("total_bytes", json!(fields::integer_or_zero(info, total_key))),
        ("last_minute", json!(fields::integer_or_zero(info, minute_key))),
    ])
}

const SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "clients_online",
        unit: None,
        value: |s| integer_field(s, fields::CLIENTS_ONLINE),
        attributes: |s| {
            BTreeMap::from([
                ("client_count", json!(s.client_count())),
                ("client_list", json!(s.client_list)),
                (
                    "query_clients",
                    json!(fields::integer_or_zero(&s.server_info, fields::QUERY_CLIENTS_ONLINE)),
                ),
            ])
        },
    },
    SensorDescription {
        key: "channels",
        unit: None,
        value: |s| integer_field(s, fields::CHANNELS_ONLINE),
        attributes: |s| {
            BTreeMap::from([
                ("channel_count", json!(s.channel_count())),
                ("channel_list", json!(s.channel_list)),
            ])
        },
    },
    SensorDescription {
        key: "uptime",
        unit: Some("s"),
        value: |s| integer_field(s, fields::UPTIME),
        attributes: no_attributes,
    },
    SensorDescription {
        key: "max_clients",
        unit: None,
        value: |s| integer_field(s, fields::MAX_CLIENTS),
        attributes: no_attributes,
    },
    SensorDescription {
        key: "bandwidth_received",
        unit: Some("B/s"),
        value: |s| integer_field(s, fields::BANDWIDTH_RECEIVED_LAST_SECOND),
        attributes: |s| {
            bandwidth_attributes(s, fields::BYTES_RECEIVED_TOTAL, fields::BANDWIDTH_RECEIVED_LAST_MINUTE)
        },
    },
    SensorDescription {
        key: "bandwidth_sent",
        unit: Some("B/s"),
        value: |s| integer_field(s, fields::BANDWIDTH_SENT_LAST_SECOND),
        attributes: |s| {
            bandwidth_attributes(s, fields::BYTES_SENT_TOTAL, fields::BANDWIDTH_SENT_LAST_MINUTE)
        },
    },
    SensorDescription {
        key: "server_status",
        unit: None,
        value: |s| {
            fields::text(&s.server_info, fields::SERVER_STATUS)
                .map(|v| SensorValue::Text(v.to_string()))
        },
        attributes: |s| {
            BTreeMap::from([
                ("server_name", text_field(s, fields::SERVER_NAME)),
                ("server_version", text_field(s, fields::SERVER_VERSION)),
                ("platform", text_field(s, fields::SERVER_PLATFORM)),
                ("server_port", text_field(s, fields::SERVER_PORT)),
            ])
        },
    },
];

/// Evaluate every sensor against a snapshot.
pub fn readings(snapshot: &Snapshot) -> Vec<Reading> {
    SENSORS
        .iter()
        .map(|sensor| Reading {
            key: sensor.key,
            unit: sensor.unit,
            value: (sensor.value)(snapshot),
            attributes: (sensor.attributes)(snapshot),
        })
        .collect()
}

pub const MANUFACTURER: &str = "TeamSpeak Systems GmbH";
pub const MODEL: &str = "TeamSpeak Server";

/// Identity of the monitored server, shared by all its sensors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub version: String,
    pub configuration_url: String,
}

pub fn device_info(snapshot: &Snapshot, descriptor: &ConnectionDescriptor) -> DeviceInfo {
    let info = &snapshot.server_info;
    DeviceInfo {
        identifier: fields::text(info, fields::SERVER_UNIQUE_ID)
            .unwrap_or_default()
            .to_string(),
        name: fields::text(info, fields::SERVER_NAME)
            .unwrap_or(crate::setup::DEFAULT_TITLE)
            .to_string(),
        manufacturer: MANUFACTURER,
        model: MODEL,
        version: fields::text(info, fields::SERVER_VERSION)
            .unwrap_or("Unknown")
            .to_string(),
        configuration_url: format!("http://{}:{}", descriptor.host, descriptor.port),
    }
}

/// Plain-text rendering, one sensor per line.
pub fn render(device: &DeviceInfo, readings: &[Reading]) -> String {
    let mut out = format!("{} ({})\n", device.name, device.version);
    for reading in readings {
        let value = reading
            .value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        let _ = match reading.unit {
            Some(unit) if reading.value.is_some() => {
                writeln!(out, "  {:<20} {} {}", reading.key, value, unit)
            }
            _ => writeln!(out, "  {:<20} {}", reading.key, value),
        };
    }
    out
}
