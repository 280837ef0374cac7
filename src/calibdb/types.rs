use crate::error::{CalibError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a calibdb query
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalibrationRequest {
    pub camera: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    /// Resolution in (width, height) order
    pub imsize: [u32; 2],
    pub api_key: u64,
}

/// Calibration fields as returned by the service.
///
/// Only `calibration_time` is interpreted; every other field is passed
/// through untouched and in the order the service sent it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CalibrationPayload(Map<String, Value>);

impl CalibrationPayload {
    pub const CALIBRATION_TIME: &'static str = "calibration_time";

    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unix timestamp (seconds) of the calibration, when present and numeric
    pub fn calibration_time(&self) -> Option<f64> {
        self.0.get(Self::CALIBRATION_TIME).and_then(Value::as_f64)
    }

    pub(crate) fn set(&mut self, key: &str, value: Value) {
        // Existing keys keep their position in the map
        self.0.insert(key.to_string(), value);
    }
}

/// Parsed calibdb response.
///
/// An `error` key takes precedence over `calib`; a response carrying neither
/// means no calibration exists for the camera.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(try_from = "Map<String, Value>")]
pub enum CalibrationResponse {
    Calibration(CalibrationPayload),
    ServiceError(String),
    NoCalibration,
}

impl CalibrationResponse {
    /// Split into the service error, if any, and the optional payload
    pub fn into_result(self) -> Result<Option<CalibrationPayload>> {
        match self {
            CalibrationResponse::Calibration(payload) => Ok(Some(payload)),
            CalibrationResponse::ServiceError(message) => Err(CalibError::ServiceError(message)),
            CalibrationResponse::NoCalibration => Ok(None),
        }
    }
}

impl TryFrom<Map<String, Value>> for CalibrationResponse {
    type Error = String;

    fn try_from(mut object: Map<String, Value>) -> std::result::Result<Self, String> {
        if let Some(error) = object.remove("error") {
            let message = match error {
                Value::String(message) => message,
                other => other.to_string(),
            };
            return Ok(CalibrationResponse::ServiceError(message));
        }

        match object.remove("calib") {
            Some(Value::Object(fields)) => {
                Ok(CalibrationResponse::Calibration(CalibrationPayload::new(fields)))
            }
            Some(other) => Err(format!("`calib` must be an object, got {}", other)),
            None => Ok(CalibrationResponse::NoCalibration),
        }
    }
}
