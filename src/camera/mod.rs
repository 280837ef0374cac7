mod constraints;
#[cfg(all(target_os = "linux", feature = "camera"))]
mod gst;
mod resolver;
#[cfg(test)]
mod tests;

pub use constraints::{nearest_mode, CameraDescriptor, CaptureConstraints, FacingMode};
#[cfg(all(target_os = "linux", feature = "camera"))]
pub use gst::GstCameraResolver;
pub use resolver::{
    resolver_from_config, CameraResolver, MockCameraResolver, MockOutcome, StaticCameraResolver,
};
