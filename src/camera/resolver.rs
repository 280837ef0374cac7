use super::constraints::{CameraDescriptor, CaptureConstraints};
use crate::config::CameraConfig;
use crate::error::{CalibError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Source of the camera identity used as the calibdb lookup key
#[async_trait]
pub trait CameraResolver: Send + Sync {
    /// Open a camera matching `constraints` and report its label and the
    /// resolution it actually negotiated
    async fn resolve(&self, constraints: &CaptureConstraints) -> Result<CameraDescriptor>;
}

/// Resolver that reports a configured camera without touching hardware
pub struct StaticCameraResolver {
    descriptor: CameraDescriptor,
}

impl StaticCameraResolver {
    pub fn new(descriptor: CameraDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl CameraResolver for StaticCameraResolver {
    async fn resolve(&self, _constraints: &CaptureConstraints) -> Result<CameraDescriptor> {
        debug!("Using configured camera {}", self.descriptor);
        Ok(self.descriptor.clone())
    }
}

/// Outcome a [`MockCameraResolver`] replays
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Camera(CameraDescriptor),
    NotFound,
    PermissionDenied,
    Unknown(String),
}

/// Mock resolver for testing
pub struct MockCameraResolver {
    outcome: MockOutcome,
    calls: AtomicUsize,
    last_constraints: Mutex<Option<CaptureConstraints>>,
}

impl MockCameraResolver {
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_constraints: Mutex::new(None),
        }
    }

    pub fn with_camera<S: Into<String>>(label: S, width: u32, height: u32) -> Self {
        Self::new(MockOutcome::Camera(CameraDescriptor::new(label, width, height)))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.last_constraints.lock().clone()
    }
}

#[async_trait]
impl CameraResolver for MockCameraResolver {
    async fn resolve(&self, constraints: &CaptureConstraints) -> Result<CameraDescriptor> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self.last_constraints.lock() = Some(constraints.clone());

        match &self.outcome {
            MockOutcome::Camera(descriptor) => Ok(descriptor.clone()),
            MockOutcome::NotFound => Err(CalibError::DeviceNotFound),
            MockOutcome::PermissionDenied => Err(CalibError::PermissionDenied),
            MockOutcome::Unknown(message) => Err(CalibError::unknown_device(message.clone())),
        }
    }
}

/// Pick the resolver for this configuration.
///
/// A configured `camera.label` always wins; otherwise the GStreamer
/// resolver is used when the crate is built with camera support.
pub fn resolver_from_config(config: &CameraConfig) -> Result<Box<dyn CameraResolver>> {
    if let Some(label) = &config.label {
        let (width, height) = config.resolution;
        info!(
            "Camera label configured, skipping device enumeration: {} ({}x{})",
            label, width, height
        );
        return Ok(Box::new(StaticCameraResolver::new(CameraDescriptor::new(
            label.clone(),
            width,
            height,
        ))));
    }

    #[cfg(all(target_os = "linux", feature = "camera"))]
    {
        let resolver = super::gst::GstCameraResolver::new(config)?;
        return Ok(Box::new(resolver));
    }

    #[cfg(not(all(target_os = "linux", feature = "camera")))]
    {
        return Err(CalibError::unknown_device(
            "built without camera support; set camera.label to query a known camera",
        ));
    }
}
