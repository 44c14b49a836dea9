//! Pinhole intrinsics derived from image size and field of view.

use crate::config::CameraConfig;

/// Pinhole camera model in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    /// Build intrinsics for a `width × height` image with field of view `fov` (radians).
    ///
    /// Both focal lengths derive from the width (`fx = fy = width / (2·tan(fov/2))`),
    /// matching the simulator pipeline the clouds are compared against.
    pub fn from_fov(width: u32, height: u32, fov: f32) -> Self {
        let focal = width as f64 / (2.0 * (fov as f64 / 2.0).tan());
        Self {
            width,
            height,
            fx: focal as f32,
            fy: focal as f32,
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::from_fov(config.width, config.height, config.fov_deg.to_radians())
    }
}
