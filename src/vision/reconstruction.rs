//! Back-projection of RGBD frames and accumulation into a world-frame cloud.
//!
//! # Frames
//!
//! - Camera frame: X right, Y down, Z forward along the optical axis.
//! - World frame: X forward at yaw 0°, Y at yaw 90°, Z up.
//!
//! A camera point maps to the world frame as `R_yaw(pose.yaw) · R_FIXED · p + t`,
//! where [`camera_to_body`] is the constant axis permutation and `t` is the
//! pose position.

use crate::config::CaptureConfig;
use crate::core::Pose;
use crate::error::{DrishtiError, Result};
use crate::vision::decoder::Frame;
use crate::vision::intrinsics::Intrinsics;
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

/// A 3D point with its RGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: Point3<f32>,
    pub color: [u8; 3],
}

impl ColoredPoint {
    #[inline]
    pub fn new(position: Point3<f32>, color: [u8; 3]) -> Self {
        Self { position, color }
    }
}

/// Fixed rotation from the camera optical frame to the drone body frame.
///
/// Camera forward (+Z) becomes body forward (+X), camera right (+X) becomes
/// body −Y, camera down (+Y) becomes body −Z.
#[inline]
pub fn camera_to_body() -> Matrix3<f32> {
    Matrix3::new(
        0.0, 0.0, 1.0, //
        -1.0, 0.0, 0.0, //
        0.0, -1.0, 0.0,
    )
}

/// Rotation about world Z by `yaw_deg` degrees.
#[inline]
pub fn yaw_rotation(yaw_deg: f64) -> Matrix3<f32> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), yaw_deg.to_radians())
        .into_inner()
        .cast::<f32>()
}

/// Rigid transform taking camera-frame points into the world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub rotation: Matrix3<f32>,
    pub translation: Vector3<f32>,
}

impl WorldTransform {
    /// Camera-to-world transform for a drone at `pose`.
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            rotation: yaw_rotation(pose.yaw) * camera_to_body(),
            translation: Vector3::new(pose.x as f32, pose.y as f32, pose.z as f32),
        }
    }

    #[inline]
    pub fn apply(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.rotation * p.coords + self.translation)
    }
}

/// Depth handling applied during back-projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthFilter {
    /// Raw values below this are raised to it before inversion
    pub floor: f32,
    /// Metric depths beyond this are dropped
    pub max_depth: Option<f32>,
}

impl DepthFilter {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            floor: config.depth_floor,
            max_depth: config.max_depth(),
        }
    }

    /// Metric depth for a raw (inverse) sample, or `None` if it is unusable.
    #[inline]
    pub fn metric_depth(&self, raw: f32) -> Option<f32> {
        // NaN fails the comparison and stays NaN
        let raw = if raw < self.floor { self.floor } else { raw };
        let d = 1.0 / raw;
        if !d.is_finite() || d <= 0.0 {
            return None;
        }
        match self.max_depth {
            Some(max) if d > max => None,
            _ => Some(d),
        }
    }
}

impl Default for DepthFilter {
    fn default() -> Self {
        Self {
            floor: 1e-8,
            max_depth: Some(1000.0),
        }
    }
}

/// Back-project every usable pixel of `frame` into the camera frame.
pub fn back_project(
    frame: &Frame,
    intrinsics: &Intrinsics,
    filter: &DepthFilter,
) -> Result<Vec<ColoredPoint>> {
    if (frame.width(), frame.height()) != (intrinsics.width, intrinsics.height) {
        return Err(DrishtiError::Shape(format!(
            "frame is {}x{} but intrinsics expect {}x{}",
            frame.width(),
            frame.height(),
            intrinsics.width,
            intrinsics.height
        )));
    }

    let depth = frame.depth();
    let mut points = Vec::with_capacity(depth.as_slice().len());
    for v in 0..frame.height() {
        for u in 0..frame.width() {
            let Some(d) = filter.metric_depth(depth.get(u, v)) else {
                continue;
            };
            let x = (u as f32 - intrinsics.cx) * d / intrinsics.fx;
            let y = (v as f32 - intrinsics.cy) * d / intrinsics.fy;
            points.push(ColoredPoint::new(Point3::new(x, y, d), frame.color(u, v)));
        }
    }
    Ok(points)
}

/// Move camera-frame points into the world frame for a drone at `pose`.
pub fn to_world(points: Vec<ColoredPoint>, pose: &Pose) -> Vec<ColoredPoint> {
    let transform = WorldTransform::from_pose(pose);
    points
        .into_iter()
        .map(|p| ColoredPoint::new(transform.apply(&p.position), p.color))
        .collect()
}

/// World-frame cloud accumulated over a session. Grows monotonically.
#[derive(Debug, Clone, Default)]
pub struct GlobalPointCloud {
    points: Vec<ColoredPoint>,
}

impl GlobalPointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `batch` and return the new total.
    pub fn merge(&mut self, batch: Vec<ColoredPoint>) -> usize {
        self.points.extend(batch);
        self.points.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColoredPoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[ColoredPoint] {
        &self.points
    }

    /// Apply a rigid transform to every point in place.
    pub fn transform(&mut self, transform: &WorldTransform) {
        for p in &mut self.points {
            p.position = transform.apply(&p.position);
        }
    }
}
