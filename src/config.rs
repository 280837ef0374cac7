use crate::camera::FacingMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CalibDbConfig {
    pub camera: CameraConfig,
    pub client: ClientConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Preferred capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Preferred camera orientation
    #[serde(default = "default_facing_mode")]
    pub facing_mode: FacingMode,

    /// Only consider devices whose label or path contains this string
    #[serde(default)]
    pub device: Option<String>,

    /// Fixed camera label; skips device enumeration when set
    #[serde(default)]
    pub label: Option<String>,

    /// Seconds to wait for the first frame while negotiating the format
    #[serde(default = "default_negotiation_timeout")]
    pub negotiation_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClientConfig {
    /// Calibration service query endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key issued by the calibdb operator
    #[serde(default = "default_api_key")]
    pub api_key: u64,

    /// Client identification sent as `userAgent`
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DisplayConfig {
    /// Write the calibration to this file instead of stdout
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Indentation width of the pretty-printed calibration
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl CalibDbConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("calibdb.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.facing_mode", default_facing_mode().as_str())?
            .set_default(
                "camera.negotiation_timeout_secs",
                default_negotiation_timeout(),
            )?
            .set_default("client.endpoint", default_endpoint())?
            .set_default("client.api_key", default_api_key())?
            .set_default("display.indent", default_indent() as u64)?
            .add_source(File::with_name(&path_str).required(false))
            // CALIBDB__CLIENT__API_KEY=1234
            .add_source(
                Environment::with_prefix("CALIBDB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CalibDbConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.negotiation_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Camera negotiation_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(label) = &self.camera.label {
            if label.trim().is_empty() {
                return Err(ConfigError::Message(
                    "Camera label must not be empty when set".to_string(),
                ));
            }
        }

        if !(self.client.endpoint.starts_with("http://")
            || self.client.endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Message(format!(
                "Client endpoint must be an http(s) URL, got '{}'",
                self.client.endpoint
            )));
        }

        if self.display.indent > 16 {
            return Err(ConfigError::Message(
                "Display indent must be at most 16".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CalibDbConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                resolution: default_camera_resolution(),
                facing_mode: default_facing_mode(),
                device: None,
                label: None,
                negotiation_timeout_secs: default_negotiation_timeout(),
            },
            client: ClientConfig {
                endpoint: default_endpoint(),
                api_key: default_api_key(),
                user_agent: None,
            },
            display: DisplayConfig {
                output: None,
                indent: default_indent(),
            },
        }
    }
}

// Default value functions
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_facing_mode() -> FacingMode {
    FacingMode::Environment
}
fn default_negotiation_timeout() -> u64 {
    5
}

fn default_endpoint() -> String {
    "https://calibdb.net/query".to_string()
}
fn default_api_key() -> u64 {
    0
} // Get in touch with calibdb.net to receive a valid key

fn default_indent() -> usize {
    4
}
