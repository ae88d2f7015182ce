// API models and data fetching for the bus departure countdown display
//
// API Endpoint (default):
// - Bus info snapshot: http://127.0.0.1:5000/api/bus-info

use chrono::{DateTime, Local, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Data Structures
// ============================================================================

/// Punctuality classification reported by the server for one departure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayStatus {
    OnTime,
    Delayed,
    Early,
    Unknown,
}

impl DelayStatus {
    /// Total mapping: anything that is not a known status is `Unknown`
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("ON_TIME") => DelayStatus::OnTime,
            Some("DELAYED") => DelayStatus::Delayed,
            Some("EARLY") => DelayStatus::Early,
            _ => DelayStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemHealth {
    Ok,
    Degraded,
    Error,
    /// Client-local: the last fetch failed. Never parsed from the server.
    Unreachable,
}

impl SystemHealth {
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("DEGRADED") => SystemHealth::Degraded,
            Some("ERROR") => SystemHealth::Error,
            _ => SystemHealth::Ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub health: SystemHealth,
    pub data_source: Option<String>,
}

/// One tracked bus departure
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub destination: String,
    pub bus_number: String,
    /// Authoritative minutes from the server; `None` when the payload value
    /// is not a non-negative integer.
    pub estimated_minutes: Option<u32>,
    pub scheduled_departure_time: Option<String>,
    pub scheduled_arrival_time: Option<String>,
    pub predicted_departure_time: Option<String>,
    pub predicted_arrival_time: Option<String>,
    pub stop_number: Option<String>,
    pub delay_status: DelayStatus,
    pub is_next_bus: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub update_time: Option<String>,
    pub entries: Vec<Entry>,
    pub system_status: Option<SystemStatus>,
}

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SnapshotPayload {
    #[serde(default)]
    destinations: Option<Vec<DestinationPayload>>,
    #[serde(default)]
    update_time: Value,
    #[serde(default)]
    system_status: Option<SystemStatusPayload>,
}

// Loose values: the server has been seen sending numbers where strings are
// expected and vice versa.
#[derive(Debug, Deserialize)]
struct DestinationPayload {
    #[serde(default)]
    destination: Value,
    #[serde(default)]
    bus_number: Value,
    #[serde(default)]
    estimated_departure_minutes: Value,
    #[serde(default)]
    scheduled_departure_time: Value,
    #[serde(default)]
    scheduled_arrival_time: Value,
    #[serde(default)]
    predicted_departure_time: Value,
    #[serde(default)]
    predicted_arrival_time: Value,
    #[serde(default)]
    stop_number: Value,
    #[serde(default)]
    delay_status: Value,
    #[serde(default)]
    is_next_bus: Value,
}

#[derive(Debug, Deserialize)]
struct SystemStatusPayload {
    #[serde(default)]
    health: Value,
    #[serde(default)]
    data_source: Value,
}

impl From<DestinationPayload> for Entry {
    fn from(raw: DestinationPayload) -> Self {
        Entry {
            destination: BDCModels::text_of(&raw.destination).unwrap_or_default(),
            bus_number: BDCModels::text_of(&raw.bus_number).unwrap_or_default(),
            estimated_minutes: BDCModels::minutes_of(&raw.estimated_departure_minutes),
            scheduled_departure_time: BDCModels::text_of(&raw.scheduled_departure_time),
            scheduled_arrival_time: BDCModels::text_of(&raw.scheduled_arrival_time),
            predicted_departure_time: BDCModels::text_of(&raw.predicted_departure_time),
            predicted_arrival_time: BDCModels::text_of(&raw.predicted_arrival_time),
            stop_number: BDCModels::text_of(&raw.stop_number),
            delay_status: DelayStatus::from_wire(raw.delay_status.as_str()),
            is_next_bus: raw.is_next_bus.as_bool().unwrap_or(false),
        }
    }
}

impl From<SystemStatusPayload> for SystemStatus {
    fn from(raw: SystemStatusPayload) -> Self {
        SystemStatus {
            health: SystemHealth::from_wire(BDCModels::text_of(&raw.health).as_deref()),
            data_source: BDCModels::text_of(&raw.data_source),
        }
    }
}

impl Snapshot {
    /// Parse a response body; a missing `destinations` key is an empty list
    pub fn from_json(body: &str) -> Result<Snapshot> {
        let document: Value = serde_json::from_str(body)
            .map_err(|e| BDCError::ParseError(format!("Invalid JSON response: {}", e)))?;

        // Derived structs also accept arrays, which would read as an empty snapshot
        if !document.is_object() {
            return Err(BDCError::ParseError("expected a JSON object".to_string()));
        }

        let payload: SnapshotPayload = serde_json::from_value(document)
            .map_err(|e| BDCError::ParseError(format!("Invalid bus info payload: {}", e)))?;

        Ok(Snapshot {
            update_time: BDCModels::text_of(&payload.update_time),
            entries: payload
                .destinations
                .unwrap_or_default()
                .into_iter()
                .map(Entry::from)
                .collect(),
            system_status: payload.system_status.map(SystemStatus::from),
        })
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum BDCError {
    NetworkError(String),
    StatusError(u16),
    ParseError(String),
}

impl std::fmt::Display for BDCError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BDCError::NetworkError(e) => write!(f, "Network error: {}", e),
            BDCError::StatusError(code) => write!(f, "API responded with status: {}", code),
            BDCError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for BDCError {}

pub type Result<T> = std::result::Result<T, BDCError>;

// ============================================================================
// Data Source
// ============================================================================

/// Capability to fetch the current snapshot
pub trait SnapshotSource {
    async fn fetch(&self) -> Result<Snapshot>;
}

pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        // No request timeout: failures are only a transport error or a status
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BDCError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpSource {
            client,
            url: url.into(),
        })
    }
}

impl SnapshotSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BDCError::NetworkError(format!("Failed to fetch bus info: {}", e)))?;

        if !response.status().is_success() {
            return Err(BDCError::StatusError(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BDCError::NetworkError(format!("Failed to read response: {}", e)))?;

        Snapshot::from_json(&body)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Zone used to show wall-clock times
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayZone {
    Local,
    Named(Tz),
}

pub struct BDCModels;

impl BDCModels {
    const NAIVE_FORMATS: [&'static str; 3] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    /// Non-empty string, or a number rendered as text
    pub fn text_of(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Non-negative whole minutes, from a number or a numeric string
    pub fn minutes_of(value: &Value) -> Option<u32> {
        match value {
            Value::Number(n) => {
                if let Some(whole) = n.as_u64() {
                    u32::try_from(whole).ok()
                } else {
                    n.as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
                        .map(|f| f as u32)
                }
            }
            Value::String(s) => s.trim().parse::<u32>().ok(),
            _ => None,
        }
    }

    /// Format an update timestamp as `HH:MM` wall-clock time
    pub fn format_update_time(raw: Option<&str>, zone: DisplayZone) -> String {
        let raw = match raw.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return "--:--".to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return match zone {
                DisplayZone::Local => dt.with_timezone(&Local).format("%H:%M").to_string(),
                DisplayZone::Named(tz) => dt.with_timezone(&tz).format("%H:%M").to_string(),
            };
        }

        // Offset-less timestamps are already wall-clock
        for pattern in Self::NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
                return naive.format("%H:%M").to_string();
            }
        }

        raw.to_string()
    }
}
