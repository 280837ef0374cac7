use serde::{Deserialize, Serialize};
use std::fmt;

/// Preferred camera orientation
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear-facing, pointing away from the user
    Environment,
    /// Front-facing, pointing at the user
    User,
    /// No preference
    Any,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
            FacingMode::Any => "any",
        }
    }

    /// Whether a device-reported location ("back", "front", "external")
    /// satisfies this preference
    pub fn matches_location(&self, location: &str) -> bool {
        let location = location.to_ascii_lowercase();
        match self {
            FacingMode::Environment => location == "back" || location == "environment",
            FacingMode::User => location == "front" || location == "user",
            FacingMode::Any => true,
        }
    }
}

/// Capability hints passed to the camera resolver.
///
/// Frames are never scaled to fit `width`/`height`; the resolver picks the
/// native device mode nearest to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub facing_mode: FacingMode,
    pub audio: bool,
}

impl CaptureConstraints {
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn facing_mode(mut self, facing_mode: FacingMode) -> Self {
        self.facing_mode = facing_mode;
        self
    }
}

impl Default for CaptureConstraints {
    // calibdb also matches against the resolution nearest to 1280x720
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            facing_mode: FacingMode::Environment,
            audio: false,
        }
    }
}

/// Identity and negotiated resolution of the camera that was opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDescriptor {
    /// Device-reported label; not guaranteed to be unique or stable
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl CameraDescriptor {
    pub fn new<S: Into<String>>(label: S, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
        }
    }

    /// Resolution in (width, height) order, as sent to calibdb
    pub fn imsize(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

impl fmt::Display for CameraDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.label, self.width, self.height)
    }
}

/// Pick the supported mode closest to the preferred resolution.
///
/// Distance is the sum of the absolute width and height differences; ties
/// keep the mode listed first.
pub fn nearest_mode(modes: &[(u32, u32)], preferred: (u32, u32)) -> Option<(u32, u32)> {
    modes
        .iter()
        .copied()
        .min_by_key(|&(w, h)| w.abs_diff(preferred.0) as u64 + h.abs_diff(preferred.1) as u64)
}
