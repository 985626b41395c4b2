use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Delay between the end of one poll round and the next request
pub const DEFAULT_POLL_DELAY_MS: u64 = 1000;

/// Divisor turning a millisecond offset into chart minutes
pub const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Milliseconds since UNIX epoch
pub type TimestampMillis = i64;

/// Resume position handed out by the status server.
///
/// Both tokens are opaque: whatever JSON value the server sent is echoed back
/// verbatim on the next request. Absent tokens are left out of the request
/// body entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen: Option<Value>,
}

impl Cursor {
    pub fn new(id: Option<Value>, seen: Option<Value>) -> Self {
        Self {
            id: id.filter(|v| !v.is_null()),
            seen: seen.filter(|v| !v.is_null()),
        }
    }

    /// Cursor for the next round, read from a response body.
    pub fn from_response(body: &Value) -> Self {
        Self::new(body.get("id").cloned(), body.get("seen").cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.seen.is_none()
    }

    /// JSON request body carrying only the tokens that are set
    pub fn to_request_body(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(id) = &self.id {
            body.insert("id".to_string(), id.clone());
        }
        if let Some(seen) = &self.seen {
            body.insert("seen".to_string(), seen.clone());
        }
        Value::Object(body)
    }
}

fn missing() -> f64 {
    f64::NAN
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(f64::NAN))
}

/// Per-pool worker counts as reported by the status server.
///
/// Fields that are missing or not numeric decode to NaN; they flow into the
/// chart as gaps instead of failing the whole report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    #[serde(default = "missing", deserialize_with = "lenient_number")]
    pub load: f64,
    #[serde(default = "missing", deserialize_with = "lenient_number")]
    pub up: f64,
    #[serde(default = "missing", deserialize_with = "lenient_number")]
    pub starting: f64,
    #[serde(default = "missing", deserialize_with = "lenient_number")]
    pub desired: f64,
}

impl PoolStats {
    pub fn new(load: f64, up: f64, starting: f64, desired: f64) -> Self {
        Self {
            load,
            up,
            starting,
            desired,
        }
    }

    /// Stats with every field unknown
    pub fn unknown() -> Self {
        Self {
            load: f64::NAN,
            up: f64::NAN,
            starting: f64::NAN,
            desired: f64::NAN,
        }
    }

    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|_| Self::unknown())
    }
}

/// One recorded snapshot of a pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: TimestampMillis,
    pub load: f64,
    pub up: f64,
    pub starting: f64,
    pub desired: f64,
}

impl Sample {
    pub fn new(timestamp: TimestampMillis, stats: &PoolStats) -> Self {
        Self {
            timestamp,
            load: stats.load,
            up: stats.up,
            starting: stats.starting,
            desired: stats.desired,
        }
    }

    /// Signed offset from `now` in minutes; negative means the past.
    ///
    /// Computed in floating point so extreme timestamps cannot overflow.
    pub fn minutes_before(&self, now: TimestampMillis) -> f64 {
        (self.timestamp as f64 - now as f64) / MILLIS_PER_MINUTE
    }
}

/// A point of a derived chart series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
}

/// Typed view of a status server response body.
///
/// The server answers `{id, seen, status: {stats: {<pool>: {...}}, text}}`.
/// Anything missing decodes to an empty value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub cursor: Cursor,
    pub stats: BTreeMap<String, PoolStats>,
    pub text: String,
}

impl StatusReport {
    pub fn from_body(body: &Value) -> Self {
        let status = body.get("status");

        let stats = status
            .and_then(|s| s.get("stats"))
            .and_then(Value::as_object)
            .map(|pools| {
                pools
                    .iter()
                    .map(|(name, value)| (name.clone(), PoolStats::from_value(value)))
                    .collect()
            })
            .unwrap_or_default();

        let text = status
            .and_then(|s| s.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            cursor: Cursor::from_response(body),
            stats,
            text,
        }
    }
}
