//! Drishti - RGBD scanning client for a simulated camera drone
//!
//! Drives the drone through a grid of poses over a length-prefixed TCP
//! protocol, tracks its pose by dead reckoning, and back-projects every
//! RGBD capture into one world-frame colored point cloud.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main.rs                        │  ← Executable
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                 session / scan                      │  ← Orchestration
//! │        (capture retry, grid and heading sweep)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌──────────────────────────┐ ┌────────────────────────┐
//! │         vision/          │ │        motion/         │  ← Algorithms
//! │ (decode, intrinsics,     │ │   (dead reckoning)     │
//! │  back-projection)        │ │                        │
//! └──────────────────────────┘ └────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                       io/                           │  ← Infrastructure
//! │            (frame channel, PCD export)              │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      core/                          │  ← Foundation
//! │               (pose, commands, math)                │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Limitations
//!
//! The pose is never measured, only integrated from issued commands, so
//! any step the simulator executes differently from `move_step` /
//! `rotate_step` shows up as drift in the cloud.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;
pub mod error;
pub mod config;

// ============================================================================
// Layer 2: Infrastructure
// ============================================================================
pub mod io;

// ============================================================================
// Layer 3: Algorithms
// ============================================================================
pub mod motion;
pub mod vision;

// ============================================================================
// Layer 4: Orchestration
// ============================================================================
pub mod scan;
pub mod session;

// ============================================================================
// Convenience re-exports
// ============================================================================

pub use config::DrishtiConfig;
pub use crate::core::{Axis, Command, Pose};
pub use error::{DrishtiError, FramingError, Result};
pub use io::{FrameChannel, PcdEncoding, RgbdPayload, SimulatorLink, save_pcd, write_pcd};
pub use motion::PoseEstimator;
pub use scan::{ScanPlan, ScanSummary};
pub use session::{CaptureReport, CaptureSession, RetryPolicy};
pub use vision::{
    ColoredPoint, DepthFilter, DepthGrid, Frame, FrameDecoder, GlobalPointCloud, Intrinsics,
    WorldTransform, back_project, to_world,
};
