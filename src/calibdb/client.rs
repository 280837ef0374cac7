use super::types::{CalibrationPayload, CalibrationRequest, CalibrationResponse};
use crate::config::ClientConfig;
use crate::error::{CalibError, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

/// Client identification sent with every query.
///
/// The service uses it for matching heuristics, not for authentication.
pub fn default_user_agent() -> String {
    format!(
        "calibdb-query/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// HTTP client for the calibdb query endpoint
#[derive(Clone)]
pub struct CalibDbClient {
    http: Client,
    endpoint: String,
    user_agent: String,
    api_key: u64,
}

impl CalibDbClient {
    /// Create a client for `config.endpoint` authenticating with `config.api_key`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(default_user_agent);

        // No request timeout: a query runs until the service answers
        let http = Client::builder().user_agent(user_agent.clone()).build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            user_agent,
            api_key: config.api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_request(&self, camera: &str, imsize: [u32; 2]) -> CalibrationRequest {
        CalibrationRequest {
            camera: camera.to_string(),
            user_agent: self.user_agent.clone(),
            imsize,
            api_key: self.api_key,
        }
    }

    /// Send one query for `camera` at `imsize`.
    ///
    /// Returns `Ok(None)` when the service knows no calibration for the
    /// camera. A non-200 status fails before the body is looked at.
    pub async fn query(&self, camera: &str, imsize: [u32; 2]) -> Result<Option<CalibrationPayload>> {
        let request = self.build_request(camera, imsize);

        info!(
            "Querying {} for '{}' at {}x{}",
            self.endpoint, camera, imsize[0], imsize[1]
        );

        let response = self.http.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("calibdb query returned status {}", status);
            return Err(CalibError::QueryFailed {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!("Received {} byte response", body.len());

        let parsed: CalibrationResponse = serde_json::from_slice(&body)
            .map_err(|e| CalibError::invalid_response(e.to_string()))?;

        if let CalibrationResponse::ServiceError(message) = &parsed {
            warn!("calibdb reported an error: {}", message);
        }

        parsed.into_result()
    }
}
