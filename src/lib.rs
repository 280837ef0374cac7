pub mod app_orchestration;
pub mod calibdb;
pub mod camera;
pub mod config;
pub mod display;
pub mod error;

pub use app_orchestration::{
    describe_request, mask_api_key, report_failure, QueryOrchestrator, QueryOutcome,
};
pub use calibdb::{CalibDbClient, CalibrationPayload, CalibrationRequest, CalibrationResponse};
pub use camera::{
    resolver_from_config, CameraDescriptor, CameraResolver, CaptureConstraints, FacingMode,
    StaticCameraResolver,
};
pub use config::CalibDbConfig;
pub use display::{ConsolePresenter, Presenter, RecordingPresenter};
pub use error::{CalibError, Result};
