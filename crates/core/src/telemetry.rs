//! Telemetry value model shared by the platform client and the polling layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{EntityUuid, EpochMillis};
use crate::widget::{Parameter, Widget};

/// Upper bound on points requested in one ranged read.
pub const MAX_POINTS_PER_READ: u32 = 50_000;

/// One time-series sample as the platform returns it.
///
/// The platform stringifies numbers on read (`"7.2"`), so `value` is kept
/// as raw JSON and interpreted through [`TelemetryPoint::numeric_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub ts: EpochMillis,
    pub value: Value,
}

impl TelemetryPoint {
    pub fn numeric_value(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// `{key: [{ts, value}, ...]}` for one device.
pub type TelemetrySeries = BTreeMap<String, Vec<TelemetryPoint>>;

/// The most recent point for `key`, by timestamp.
pub fn latest_point<'a>(series: &'a TelemetrySeries, key: &str) -> Option<&'a TelemetryPoint> {
    series.get(key)?.iter().max_by_key(|p| p.ts)
}

// ---------------------------------------------------------------------------
// Time ranges
// ---------------------------------------------------------------------------

/// A ranged read. With neither bound set the platform returns the latest
/// value per key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub start_ts: Option<EpochMillis>,
    #[serde(default)]
    pub end_ts: Option<EpochMillis>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl TimeRange {
    pub fn latest() -> Self {
        Self::default()
    }

    pub fn between(start_ts: EpochMillis, end_ts: EpochMillis) -> Self {
        Self {
            start_ts: Some(start_ts),
            end_ts: Some(end_ts),
            limit: None,
        }
    }

    pub fn is_latest(&self) -> bool {
        self.start_ts.is_none() && self.end_ts.is_none()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.start_ts, self.end_ts) {
            (Some(start), Some(end)) if start > end => {
                return Err(CoreError::Validation(format!(
                    "start_ts ({start}) must not be after end_ts ({end})"
                )));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(CoreError::Validation(
                    "start_ts and end_ts must be given together".to_string(),
                ));
            }
            _ => {}
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_POINTS_PER_READ {
                return Err(CoreError::Validation(format!(
                    "limit must be between 1 and {MAX_POINTS_PER_READ}"
                )));
            }
            if self.is_latest() {
                return Err(CoreError::Validation(
                    "limit only applies to ranged reads".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Request planning
// ---------------------------------------------------------------------------

/// The keys one widget needs from one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceKeys {
    pub device_id: EntityUuid,
    pub keys: Vec<String>,
}

/// Group the telemetry keys a widget reads by device, in first-seen order.
///
/// Image and alarm parameters read no time series and contribute nothing.
pub fn telemetry_requests(widget: &Widget) -> Vec<DeviceKeys> {
    let mut requests: Vec<DeviceKeys> = Vec::new();

    for parameter in &widget.parameters {
        let (device_id, keys): (EntityUuid, Vec<&str>) = match parameter {
            Parameter::Telemetry(b) => (b.device_id, vec![b.key.as_str()]),
            Parameter::Location(b) => (b.device_id, vec![b.lat_key.as_str(), b.lon_key.as_str()]),
            Parameter::Table(b) => (b.device_id, b.keys.iter().map(String::as_str).collect()),
            Parameter::Image(_) | Parameter::Alarm(_) => continue,
        };

        let idx = match requests.iter().position(|r| r.device_id == device_id) {
            Some(idx) => idx,
            None => {
                requests.push(DeviceKeys {
                    device_id,
                    keys: Vec::new(),
                });
                requests.len() - 1
            }
        };
        let entry = &mut requests[idx];
        for key in keys {
            if !entry.keys.iter().any(|k| k == key) {
                entry.keys.push(key.to_string());
            }
        }
    }

    requests
}

/// Split a comma-separated key list, trimming blanks and repeats.
pub fn parse_keys(csv: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in csv.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// A telemetry write is a flat `{key: scalar}` object with at least one key.
pub fn validate_telemetry_write(values: &serde_json::Map<String, Value>) -> Result<(), CoreError> {
    if values.is_empty() {
        return Err(CoreError::Validation(
            "telemetry write must contain at least one key".to_string(),
        ));
    }
    for (key, value) in values {
        if key.trim().is_empty() {
            return Err(CoreError::Validation(
                "telemetry key must not be empty".to_string(),
            ));
        }
        if !matches!(value, Value::Number(_) | Value::String(_) | Value::Bool(_)) {
            return Err(CoreError::Validation(format!(
                "telemetry value for '{key}' must be a number, string or boolean"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
