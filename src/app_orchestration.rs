use crate::calibdb::{CalibDbClient, CalibrationRequest};
use crate::camera::{CameraDescriptor, CameraResolver, CaptureConstraints};
use crate::display::{alert_message, format_calibration, no_calibration_message, Presenter};
use crate::error::{CalibError, Result};
use tracing::{debug, error, info};

/// How a query run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Calibration found and shown
    Displayed(String),
    /// calibdb has no calibration for the camera
    NoCalibration(String),
    /// The run failed and the user was alerted
    Alerted(String),
}

impl QueryOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            QueryOutcome::Displayed(_) => 0,
            QueryOutcome::Alerted(_) => 1,
            QueryOutcome::NoCalibration(_) => 2,
        }
    }
}

/// Runs camera resolution, the calibdb query and presentation in sequence
pub struct QueryOrchestrator<'a> {
    resolver: &'a dyn CameraResolver,
    client: &'a CalibDbClient,
    presenter: &'a dyn Presenter,
    constraints: CaptureConstraints,
    indent: usize,
}

impl<'a> QueryOrchestrator<'a> {
    pub fn new(
        resolver: &'a dyn CameraResolver,
        client: &'a CalibDbClient,
        presenter: &'a dyn Presenter,
    ) -> Self {
        Self {
            resolver,
            client,
            presenter,
            constraints: CaptureConstraints::default(),
            indent: 4,
        }
    }

    pub fn with_constraints(mut self, constraints: CaptureConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Resolve the camera and build the request without sending it
    pub async fn prepare(&self) -> Result<(CameraDescriptor, CalibrationRequest)> {
        let camera = self.resolver.resolve(&self.constraints).await?;
        let request = self.client.build_request(&camera.label, camera.imsize());
        Ok((camera, request))
    }

    /// Run one query. Every failure ends in exactly one presenter alert.
    pub async fn run(&self) -> QueryOutcome {
        match self.query().await {
            Ok(outcome) => outcome,
            Err(e) => report_failure(self.presenter, &e),
        }
    }

    async fn query(&self) -> Result<QueryOutcome> {
        let camera = self.resolver.resolve(&self.constraints).await?;
        info!("Using camera {}", camera);

        match self.client.query(&camera.label, camera.imsize()).await? {
            Some(payload) => {
                let text = format_calibration(payload, self.indent)?;
                debug!("Formatted calibration ({} bytes)", text.len());
                self.presenter.show_calibration(&text)?;
                Ok(QueryOutcome::Displayed(text))
            }
            None => {
                let message = no_calibration_message(&camera.label);
                info!("{}", message);
                self.presenter.alert(&message);
                Ok(QueryOutcome::NoCalibration(message))
            }
        }
    }
}

/// Alert the user about a failure that ends the run
pub fn report_failure(presenter: &dyn Presenter, error: &CalibError) -> QueryOutcome {
    error!("Calibration query failed: {}", error);
    let message = alert_message(error);
    presenter.alert(&message);
    QueryOutcome::Alerted(message)
}

/// Mask all but the last two digits of an API key for display
pub fn mask_api_key(api_key: u64) -> String {
    let digits = api_key.to_string();
    if digits.len() <= 2 {
        return "*".repeat(digits.len());
    }
    format!("{}{}", "*".repeat(digits.len() - 2), &digits[digits.len() - 2..])
}

/// Render a request for `--dry-run` with the API key masked
pub fn describe_request(request: &CalibrationRequest) -> Result<String> {
    let mut value = serde_json::to_value(request)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| CalibError::invalid_response("request did not serialize to an object"))?;
    object.insert(
        "api_key".to_string(),
        serde_json::Value::String(mask_api_key(request.api_key)),
    );
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibdb::mock::MockCalibDb;
    use crate::camera::{MockCameraResolver, MockOutcome};
    use crate::config::ClientConfig;
    use crate::display::{RecordingPresenter, NO_CAMERA_ALERT};
    use axum::http::StatusCode;
    use serde_json::json;

    fn client_for(service: &MockCalibDb) -> CalibDbClient {
        let config = ClientConfig {
            endpoint: service.endpoint(),
            api_key: 7,
            user_agent: None,
        };
        CalibDbClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_run_displays_calibration() {
        let service = MockCalibDb::start(
            StatusCode::OK,
            json!({"calib": {"calibration_time": 1700000000, "foo": "bar"}}),
        )
        .await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::with_camera("HD Webcam", 1280, 720);
        let presenter = RecordingPresenter::new();

        let outcome = QueryOrchestrator::new(&resolver, &client, &presenter)
            .run()
            .await;

        let expected =
            "{\n    \"calibration_time\": \"Tue, 14 Nov 2023 22:13:20 GMT\",\n    \"foo\": \"bar\"\n}";
        assert_eq!(outcome, QueryOutcome::Displayed(expected.to_string()));
        assert_eq!(presenter.calibrations(), vec![expected.to_string()]);
        assert!(presenter.alerts().is_empty());
        assert_eq!(resolver.call_count(), 1);
        assert_eq!(service.hits(), 1);
    }

    #[tokio::test]
    async fn test_run_uses_negotiated_resolution() {
        let service = MockCalibDb::start(StatusCode::OK, json!({"calib": {}})).await;
        let client = client_for(&service);
        // Requested 1280x720, camera negotiated 1280x960
        let resolver = MockCameraResolver::with_camera("HD Webcam", 1280, 960);
        let presenter = RecordingPresenter::new();

        QueryOrchestrator::new(&resolver, &client, &presenter)
            .with_constraints(CaptureConstraints::with_resolution(1280, 720))
            .run()
            .await;

        assert_eq!(service.bodies()[0]["imsize"], json!([1280, 960]));
        assert_eq!(
            resolver.last_constraints(),
            Some(CaptureConstraints::with_resolution(1280, 720))
        );
    }

    #[tokio::test]
    async fn test_run_reports_missing_calibration() {
        let service = MockCalibDb::start(StatusCode::OK, json!({})).await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::with_camera("Integrated Camera", 640, 480);
        let presenter = RecordingPresenter::new();

        let outcome = QueryOrchestrator::new(&resolver, &client, &presenter)
            .run()
            .await;

        let message =
            "no calibration for Integrated Camera available. Visit calibdb.net to create one.";
        assert_eq!(outcome, QueryOutcome::NoCalibration(message.to_string()));
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(presenter.alerts(), vec![message.to_string()]);
        assert!(presenter.calibrations().is_empty());
    }

    #[tokio::test]
    async fn test_permission_denied_skips_query() {
        let service = MockCalibDb::start(StatusCode::OK, json!({"calib": {}})).await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::new(MockOutcome::PermissionDenied);
        let presenter = RecordingPresenter::new();

        let outcome = QueryOrchestrator::new(&resolver, &client, &presenter)
            .run()
            .await;

        assert_eq!(outcome, QueryOutcome::Alerted(NO_CAMERA_ALERT.to_string()));
        assert_eq!(presenter.alerts(), vec![NO_CAMERA_ALERT.to_string()]);
        assert_eq!(service.hits(), 0);
    }

    #[tokio::test]
    async fn test_unknown_device_error_uses_default_text() {
        let service = MockCalibDb::start(StatusCode::OK, json!({"calib": {}})).await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::new(MockOutcome::Unknown("device busy".to_string()));
        let presenter = RecordingPresenter::new();

        let outcome = QueryOrchestrator::new(&resolver, &client, &presenter)
            .run()
            .await;

        assert_eq!(outcome, QueryOutcome::Alerted("Camera error: device busy".to_string()));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_service_error_alert() {
        let service = MockCalibDb::start(StatusCode::OK, json!({"error": "invalid api_key"})).await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::with_camera("HD Webcam", 1280, 720);
        let presenter = RecordingPresenter::new();

        let outcome = QueryOrchestrator::new(&resolver, &client, &presenter)
            .run()
            .await;

        assert_eq!(outcome, QueryOutcome::Alerted("invalid api_key".to_string()));
        assert_eq!(presenter.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_status_failure_alert() {
        let service = MockCalibDb::start(StatusCode::FORBIDDEN, json!({"error": "nope"})).await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::with_camera("HD Webcam", 1280, 720);
        let presenter = RecordingPresenter::new();

        let outcome = QueryOrchestrator::new(&resolver, &client, &presenter)
            .run()
            .await;

        assert_eq!(
            outcome,
            QueryOutcome::Alerted("calibdb query failed with status: 403".to_string())
        );
    }

    #[tokio::test]
    async fn test_prepare_does_not_contact_service() {
        let service = MockCalibDb::start(StatusCode::OK, json!({"calib": {}})).await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::with_camera("HD Webcam", 1920, 1080);
        let presenter = RecordingPresenter::new();

        let (camera, request) = QueryOrchestrator::new(&resolver, &client, &presenter)
            .prepare()
            .await
            .unwrap();

        assert_eq!(camera.label, "HD Webcam");
        assert_eq!(request.imsize, [1920, 1080]);
        assert_eq!(request.api_key, 7);
        assert_eq!(service.hits(), 0);
    }

    #[tokio::test]
    async fn test_prepare_failure_is_reported_as_alert() {
        let service = MockCalibDb::start(StatusCode::OK, json!({"calib": {}})).await;
        let client = client_for(&service);
        let resolver = MockCameraResolver::new(MockOutcome::PermissionDenied);
        let presenter = RecordingPresenter::new();

        let error = QueryOrchestrator::new(&resolver, &client, &presenter)
            .prepare()
            .await
            .unwrap_err();
        let outcome = report_failure(&presenter, &error);

        assert_eq!(outcome, QueryOutcome::Alerted(NO_CAMERA_ALERT.to_string()));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(presenter.alerts(), vec![NO_CAMERA_ALERT.to_string()]);
        assert_eq!(service.hits(), 0);
    }

    #[test]
    fn test_client_setup_failure_is_reported_as_alert() {
        let presenter = RecordingPresenter::new();
        let error = CalibError::invalid_response("builder error");

        let outcome = report_failure(&presenter, &error);

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(presenter.alerts().len(), 1);
        assert!(presenter.calibrations().is_empty());
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key(0), "*");
        assert_eq!(mask_api_key(123456), "****56");
    }

    #[test]
    fn test_describe_request_masks_key() {
        let request = CalibrationRequest {
            camera: "cam".to_string(),
            user_agent: "agent".to_string(),
            imsize: [640, 480],
            api_key: 987654,
        };

        let text = describe_request(&request).unwrap();
        assert!(text.contains("\"api_key\": \"****54\""));
        assert!(!text.contains("987654"));
    }
}
