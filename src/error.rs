use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibError {
    #[error("No camera found matching the requested constraints")]
    DeviceNotFound,

    #[error("Permission to access the camera was denied")]
    PermissionDenied,

    #[error("Camera error: {message}")]
    UnknownDevice { message: String },

    #[error("calibdb query failed with status: {status}")]
    QueryFailed { status: u16 },

    /// Error reported by the calibration service, shown verbatim
    #[error("{0}")]
    ServiceError(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid calibdb response: {message}")]
    InvalidResponse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CalibError {
    pub fn unknown_device<S: Into<String>>(message: S) -> Self {
        Self::UnknownDevice {
            message: message.into(),
        }
    }

    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// True for the two device errors that get the "no camera" alert
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, Self::DeviceNotFound | Self::PermissionDenied)
    }
}

pub type Result<T> = std::result::Result<T, CalibError>;
