use super::constraints::{nearest_mode, CameraDescriptor, CaptureConstraints, FacingMode};
use super::resolver::CameraResolver;
use crate::config::CameraConfig;
use crate::error::{CalibError, Result};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Device property keys that carry the device node path
const DEVICE_PATH_KEYS: &[&str] = &["device.path", "api.v4l2.path", "object.path"];

/// Device property key that carries the camera mounting location
const LOCATION_KEY: &str = "api.libcamera.location";

/// GStreamer-backed camera resolver
pub struct GstCameraResolver {
    device_filter: Option<String>,
    negotiation_timeout: Duration,
}

impl GstCameraResolver {
    pub fn new(config: &CameraConfig) -> Result<Self> {
        gstreamer::init().map_err(|e| {
            CalibError::unknown_device(format!("Failed to initialize GStreamer: {}", e))
        })?;

        Ok(Self {
            device_filter: config.device.clone(),
            negotiation_timeout: Duration::from_secs(config.negotiation_timeout_secs),
        })
    }
}

#[async_trait]
impl CameraResolver for GstCameraResolver {
    async fn resolve(&self, constraints: &CaptureConstraints) -> Result<CameraDescriptor> {
        let constraints = constraints.clone();
        let device_filter = self.device_filter.clone();
        let timeout = self.negotiation_timeout;

        tokio::task::spawn_blocking(move || {
            resolve_blocking(&constraints, device_filter.as_deref(), timeout)
        })
        .await
        .map_err(|e| CalibError::unknown_device(format!("Camera task failed: {}", e)))?
    }
}

fn resolve_blocking(
    constraints: &CaptureConstraints,
    device_filter: Option<&str>,
    timeout: Duration,
) -> Result<CameraDescriptor> {
    if constraints.audio {
        warn!("Audio capture requested but not supported; ignoring");
    }

    let device = select_device(constraints, device_filter)?;
    let label = device.display_name().to_string();

    let preferred = (constraints.width, constraints.height);
    let modes = device
        .caps()
        .map(|caps| supported_modes(&caps, preferred))
        .unwrap_or_default();
    let mode = nearest_mode(&modes, preferred);
    debug!("Selected mode {:?} for '{}' (preferred {:?})", mode, label, preferred);

    let source = device.create_element(None).map_err(|e| {
        CalibError::unknown_device(format!("Failed to create camera source: {}", e))
    })?;
    let guard = CaptureGuard::open(source, mode)?;
    let (width, height) = guard.negotiated_resolution(timeout)?;

    info!("Camera '{}' negotiated {}x{}", label, width, height);
    Ok(CameraDescriptor::new(label, width, height))
}

/// What device selection needs to know about a video source
#[derive(Debug, Clone, Default)]
struct DeviceInfo {
    label: String,
    path: Option<String>,
    location: Option<String>,
}

impl DeviceInfo {
    fn from_device(device: &gstreamer::Device) -> Self {
        Self {
            label: device.display_name().to_string(),
            path: DEVICE_PATH_KEYS
                .iter()
                .find_map(|key| property_str(device, key)),
            location: property_str(device, LOCATION_KEY),
        }
    }
}

/// Index of the device to open.
///
/// With a filter, the first device whose label or path contains it.
/// Without one, the first device facing the preferred way, else the first
/// device.
fn pick_device(devices: &[DeviceInfo], filter: Option<&str>, facing: FacingMode) -> Option<usize> {
    match filter {
        Some(filter) => devices.iter().position(|device| {
            device.label.contains(filter)
                || device.path.as_deref().map_or(false, |path| path.contains(filter))
        }),
        None => devices
            .iter()
            .position(|device| {
                device
                    .location
                    .as_deref()
                    .map_or(false, |location| facing.matches_location(location))
            })
            .or_else(|| (!devices.is_empty()).then_some(0)),
    }
}

fn select_device(
    constraints: &CaptureConstraints,
    device_filter: Option<&str>,
) -> Result<gstreamer::Device> {
    let monitor = gstreamer::DeviceMonitor::new();
    let _filter_id = monitor.add_filter(Some("Video/Source"), None);
    monitor.start().map_err(|e| {
        CalibError::unknown_device(format!("Failed to start device monitor: {}", e))
    })?;
    let devices: Vec<gstreamer::Device> = monitor.devices().into_iter().collect();
    monitor.stop();

    debug!("Device monitor reported {} video sources", devices.len());

    let infos: Vec<DeviceInfo> = devices.iter().map(DeviceInfo::from_device).collect();
    pick_device(&infos, device_filter, constraints.facing_mode)
        .map(|index| devices[index].clone())
        .ok_or(CalibError::DeviceNotFound)
}

fn property_str(device: &gstreamer::Device, key: &str) -> Option<String> {
    device
        .properties()
        .and_then(|props| props.get::<String>(key).ok())
}

/// Size the source can deliver natively along one caps field.
///
/// Fixed values are taken as is; ranges yield the preferred size clamped
/// into the range and aligned to its step.
fn native_dimension(structure: &gstreamer::StructureRef, field: &str, preferred: u32) -> Option<u32> {
    if let Ok(value) = structure.get::<i32>(field) {
        return (value > 0).then_some(value as u32);
    }

    let range = structure.get::<gstreamer::IntRange<i32>>(field).ok()?;
    let (min, max, step) = (range.min(), range.max(), range.step().max(1));
    if max < 1 || max < min {
        return None;
    }
    let preferred = preferred.min(i32::MAX as u32) as i32;
    let clamped = preferred.clamp(min.max(1), max);
    let aligned = min + (clamped - min) / step * step;
    Some(aligned.max(1) as u32)
}

/// Native width/height pairs the caps allow, in caps order
fn supported_modes(caps: &gstreamer::CapsRef, preferred: (u32, u32)) -> Vec<(u32, u32)> {
    let mut modes = Vec::new();
    for structure in caps.iter() {
        let width = native_dimension(structure, "width", preferred.0);
        let height = native_dimension(structure, "height", preferred.1);
        if let (Some(width), Some(height)) = (width, height) {
            if !modes.contains(&(width, height)) {
                modes.push((width, height));
            }
        }
    }
    modes
}

/// An open capture pipeline, stopped when dropped
pub(crate) struct CaptureGuard {
    pipeline: Pipeline,
    appsink: AppSink,
}

impl CaptureGuard {
    /// Build `source ! capsfilter ! appsink`; the pipeline is released on
    /// drop even when assembly fails part way
    fn open(source: gstreamer::Element, mode: Option<(u32, u32)>) -> Result<Self> {
        let guard = Self {
            pipeline: Pipeline::new(),
            appsink: AppSink::builder().sync(false).max_buffers(1).drop(true).build(),
        };

        let caps = match mode {
            Some((width, height)) => gstreamer::Caps::builder_full()
                .structure(
                    gstreamer::Structure::builder("video/x-raw")
                        .field("width", width as i32)
                        .field("height", height as i32)
                        .build(),
                )
                .structure(
                    gstreamer::Structure::builder("image/jpeg")
                        .field("width", width as i32)
                        .field("height", height as i32)
                        .build(),
                )
                .build(),
            None => gstreamer::Caps::new_any(),
        };

        let filter = gstreamer::ElementFactory::make("capsfilter")
            .property("caps", &caps)
            .build()
            .map_err(|e| {
                CalibError::unknown_device(format!("Failed to create capsfilter: {}", e))
            })?;

        guard
            .pipeline
            .add_many([&source, &filter, guard.appsink.upcast_ref()])
            .map_err(|e| {
                CalibError::unknown_device(format!("Failed to assemble pipeline: {}", e))
            })?;
        gstreamer::Element::link_many([&source, &filter, guard.appsink.upcast_ref()])
            .map_err(|e| CalibError::unknown_device(format!("Failed to link pipeline: {}", e)))?;

        Ok(guard)
    }

    /// Start streaming and read the resolution of the first delivered frame
    fn negotiated_resolution(&self, timeout: Duration) -> Result<(u32, u32)> {
        if self.pipeline.set_state(gstreamer::State::Playing).is_err() {
            return Err(self
                .bus_error()
                .unwrap_or_else(|| CalibError::unknown_device("Failed to start capture pipeline")));
        }

        let sample = self
            .appsink
            .try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout.as_millis() as u64))
            .ok_or_else(|| {
                self.bus_error().unwrap_or_else(|| {
                    CalibError::unknown_device(format!("No frame received within {:?}", timeout))
                })
            })?;

        let structure = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .ok_or_else(|| CalibError::unknown_device("Negotiated caps are missing"))?;

        let width = structure
            .get::<i32>("width")
            .map_err(|e| CalibError::unknown_device(format!("Negotiated caps lack width: {}", e)))?;
        let height = structure
            .get::<i32>("height")
            .map_err(|e| CalibError::unknown_device(format!("Negotiated caps lack height: {}", e)))?;

        Ok((width as u32, height as u32))
    }

    fn bus_error(&self) -> Option<CalibError> {
        let bus = self.pipeline.bus()?;
        let message = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
        match message.view() {
            gstreamer::MessageView::Error(err) => {
                let error = err.error();
                debug!("Capture pipeline error: {} ({:?})", error, err.debug());
                Some(classify_error(
                    error.kind::<gstreamer::ResourceError>(),
                    error.message(),
                    err.debug().as_deref(),
                ))
            }
            _ => None,
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        match self.pipeline.set_state(gstreamer::State::Null) {
            Ok(_) => debug!("Capture pipeline released"),
            Err(e) => warn!("Failed to release capture pipeline: {}", e),
        }
    }
}

/// Map a GStreamer resource error onto the device error taxonomy.
///
/// v4l2src reports open failures with a generic message and puts the
/// system error text in the debug string, so both are inspected.
fn classify_error(
    kind: Option<gstreamer::ResourceError>,
    message: &str,
    debug: Option<&str>,
) -> CalibError {
    use gstreamer::ResourceError;

    let denied = |text: &str| text.contains("Permission denied") || text.contains("EACCES");
    let permission_denied = denied(message) || debug.map_or(false, denied);

    match kind {
        Some(ResourceError::NotFound) => CalibError::DeviceNotFound,
        Some(ResourceError::NotAuthorized) => CalibError::PermissionDenied,
        Some(ResourceError::OpenRead | ResourceError::OpenReadWrite | ResourceError::OpenWrite)
            if permission_denied =>
        {
            CalibError::PermissionDenied
        }
        _ => CalibError::unknown_device(message),
    }
}
