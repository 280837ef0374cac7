use crate::calibdb::CalibrationPayload;
use crate::error::{CalibError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

/// Alert shown when no camera could be opened
pub const NO_CAMERA_ALERT: &str = "No camera detected! Make sure that a camera is attached \
and you gave camera permission to this program.";

/// Message shown when calibdb has no calibration for the camera
pub fn no_calibration_message(camera: &str) -> String {
    format!(
        "no calibration for {} available. Visit calibdb.net to create one.",
        camera
    )
}

/// User-facing text for a failed query
pub fn alert_message(error: &CalibError) -> String {
    if error.is_device_unavailable() {
        NO_CAMERA_ALERT.to_string()
    } else {
        error.to_string()
    }
}

/// Render Unix seconds as an RFC 7231 UTC date, e.g. `Tue, 14 Nov 2023 22:13:20 GMT`
pub fn format_calibration_time(seconds: f64) -> Option<String> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0) as i64;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|time| time.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Pretty-print a calibration with `calibration_time` made human readable
pub fn format_calibration(mut payload: CalibrationPayload, indent: usize) -> Result<String> {
    if payload.get(CalibrationPayload::CALIBRATION_TIME).is_some() {
        match payload.calibration_time().and_then(format_calibration_time) {
            Some(formatted) => payload.set(CalibrationPayload::CALIBRATION_TIME, Value::String(formatted)),
            None => warn!(
                "Leaving unreadable calibration_time unchanged: {:?}",
                payload.get(CalibrationPayload::CALIBRATION_TIME)
            ),
        }
    }

    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut rendered = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut rendered, formatter);
    payload.serialize(&mut serializer)?;

    Ok(String::from_utf8_lossy(&rendered).into_owned())
}

/// Output surface for calibration text and alerts
pub trait Presenter: Send + Sync {
    fn show_calibration(&self, text: &str) -> Result<()>;

    fn alert(&self, message: &str);
}

/// Presenter writing calibrations to stdout (or a file) and alerts to stderr
pub struct ConsolePresenter {
    output: Option<PathBuf>,
}

impl ConsolePresenter {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }
}

impl Presenter for ConsolePresenter {
    fn show_calibration(&self, text: &str) -> Result<()> {
        match &self.output {
            Some(path) => {
                std::fs::write(path, format!("{}\n", text))?;
                info!("Calibration written to {}", path.display());
            }
            None => println!("{}", text),
        }
        Ok(())
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Presenter that keeps everything it was asked to show
#[derive(Default)]
pub struct RecordingPresenter {
    calibrations: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calibrations(&self) -> Vec<String> {
        self.calibrations.lock().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn show_calibration(&self, text: &str) -> Result<()> {
        self.calibrations.lock().push(text.to_string());
        Ok(())
    }

    fn alert(&self, message: &str) {
        self.alerts.lock().push(message.to_string());
    }
}
