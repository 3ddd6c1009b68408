use serde::Serialize;
use serde_json::{Map, Value};

use crate::alert::Alert;

/// a partial telemetry update pushed by the sensor node.
///
/// every field is optional. parsing is total over json objects: unknown keys
/// are ignored and a known key with the wrong json type is dropped for that
/// field only, so a node with one broken sensor still updates the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryPatch {
    pub board_temperature: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub cpu_temperature: Option<f64>,
    pub free_memory_bytes: Option<f64>,
    pub cpu_usage_percent: Option<f64>,
    pub wifi_signal_dbm: Option<i64>,
}

// wire names, then the names the esp32 firmware sends
const BOARD_TEMP_KEYS: &[&str] = &["board_temp", "lm75_temp"];
const AMBIENT_TEMP_KEYS: &[&str] = &["ambient_temp", "sht20_temp"];
const AMBIENT_HUMIDITY_KEYS: &[&str] = &["ambient_humidity", "sht20_humi"];
const CPU_TEMP_KEYS: &[&str] = &["cpu_temp", "esp32_temp"];
const FREE_MEMORY_KEYS: &[&str] = &["free_memory_bytes", "ram_free"];
const CPU_USAGE_KEYS: &[&str] = &["cpu_usage"];
const WIFI_RSSI_KEYS: &[&str] = &["wifi_rssi"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("payload is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload must be a json object, got {0}")]
    NotAnObject(&'static str),
    #[error("request body could not be read: {0}")]
    Unreadable(String),
}

impl TelemetryPatch {
    /// Parses a raw request body. Anything other than a json object is
    /// rejected; inside an object nothing is.
    pub fn from_json(body: &[u8]) -> Result<Self, IngestError> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(fields) => Ok(Self::from_fields(&fields)),
            other => Err(IngestError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            board_temperature: number(fields, BOARD_TEMP_KEYS),
            temperature: number(fields, AMBIENT_TEMP_KEYS),
            humidity: number(fields, AMBIENT_HUMIDITY_KEYS),
            cpu_temperature: number(fields, CPU_TEMP_KEYS),
            free_memory_bytes: number(fields, FREE_MEMORY_KEYS),
            cpu_usage_percent: number(fields, CPU_USAGE_KEYS),
            wifi_signal_dbm: integer(fields, WIFI_RSSI_KEYS),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn number(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| fields.get(*k).and_then(Value::as_f64))
}

fn integer(fields: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| fields.get(*k).and_then(Value::as_i64))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ==============================================================================
// responses
// ==============================================================================
// field names follow the dashboard's existing json contract (camelCase).

/// body of a successful or rejected ingest
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub message: &'static str,
}

impl Ack {
    pub const RECEIVED: Ack = Ack { message: "Data received successfully!" };
    pub const REJECTED: Ack = Ack { message: "Error processing data." };
}

/// full read response: snapshot, history and derived alert
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub current: CurrentReadings,
    pub history: Vec<HistoryPoint>,
    pub alert: Option<Alert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentReadings {
    /// one decimal
    pub temperature: Option<f64>,
    /// one decimal
    pub humidity: Option<f64>,
    #[serde(rename = "cpuTemp")]
    pub cpu_temperature: f64,
    #[serde(rename = "lm75Temp")]
    pub board_temperature: f64,
    #[serde(rename = "memoryUse")]
    pub memory_use_label: String,
    #[serde(rename = "cpuUse")]
    pub cpu_usage_percent: f64,
    #[serde(rename = "wifiRssi")]
    pub wifi_signal_dbm: i64,
    /// generated per request, RFC 3339 with millisecond precision
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    /// local "hh:mm AM" label
    pub name: String,
    pub temperature: f64,
    pub humidity: f64,
}
