//! Configuration loading for Drishti

use crate::error::{DrishtiError, Result};
use crate::io::PcdEncoding;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DrishtiConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Simulator connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Simulator host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port number (default: 12345)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout in milliseconds (default: 5000)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds, 0 blocks forever (default: 30000)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Receive chunk size hint in bytes (default: 4096)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest declared payload accepted (default: 256 MiB)
    #[serde(default = "default_max_payload")]
    pub max_payload_bytes: usize,
}

/// Pinhole camera parameters of the simulated sensor
#[derive(Clone, Debug, Deserialize)]
pub struct CameraConfig {
    /// Image width in pixels (default: 2560)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels (default: 1440)
    #[serde(default = "default_height")]
    pub height: u32,

    /// Field of view in degrees (default: 40)
    #[serde(default = "default_fov")]
    pub fov_deg: f32,
}

/// Discrete step sizes of the simulator's motion commands
#[derive(Clone, Debug, Deserialize)]
pub struct MotionConfig {
    /// Distance per FORWARD/BACKWARD/UP/DOWN in meters (default: 5.0)
    #[serde(default = "default_move_step")]
    pub move_step: f64,

    /// Angle per LEFTROTATE/RIGHTROTATE in degrees (default: 45.0)
    #[serde(default = "default_rotate_step")]
    pub rotate_step: f64,

    /// Pause after each motion command in milliseconds (default: 10)
    #[serde(default = "default_command_pause")]
    pub command_pause_ms: u64,
}

/// Capture cycle and reconstruction settings
#[derive(Clone, Debug, Deserialize)]
pub struct CaptureConfig {
    /// Wait after REQUEST before fetching (milliseconds, default: 1000)
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// Attempts per capture before giving up; 0 retries forever (default: 20)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between failed attempts in milliseconds (default: 500)
    #[serde(default = "default_retry_pause")]
    pub retry_pause_ms: u64,

    /// Poll CHECK for READY instead of sleeping `settle_ms` (default: false)
    #[serde(default)]
    pub poll_ready: bool,

    /// Interval between CHECK polls in milliseconds (default: 100)
    #[serde(default = "default_ready_poll_interval")]
    pub ready_poll_interval_ms: u64,

    /// Raw depth values below this are clamped before inversion (default: 1e-8)
    #[serde(default = "default_depth_floor")]
    pub depth_floor: f32,

    /// Back-projected depths beyond this are dropped; <= 0 disables (default: 1000.0)
    #[serde(default = "default_max_depth")]
    pub max_depth: f32,
}

/// Grid of capture positions and headings
#[derive(Clone, Debug, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub x_min: f64,
    #[serde(default)]
    pub x_max: f64,
    #[serde(default = "default_xy_step")]
    pub x_step: f64,
    #[serde(default)]
    pub y_min: f64,
    #[serde(default)]
    pub y_max: f64,
    #[serde(default = "default_xy_step")]
    pub y_step: f64,
    #[serde(default)]
    pub z_min: f64,
    #[serde(default)]
    pub z_max: f64,
    #[serde(default = "default_z_step")]
    pub z_step: f64,

    /// Headings captured at every cell, degrees
    #[serde(default = "default_yaws")]
    pub yaws: Vec<f64>,
}

/// Output configuration
#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    /// Path of the accumulated point cloud (PCD)
    #[serde(default = "default_cloud_path")]
    pub cloud_path: String,

    /// PCD data encoding, `ascii` or `binary` (default: binary)
    #[serde(default)]
    pub encoding: PcdEncoding,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    12345
}
fn default_connect_timeout() -> u64 {
    5000
}
fn default_read_timeout() -> u64 {
    30_000
}
fn default_chunk_size() -> usize {
    4096
}
fn default_max_payload() -> usize {
    256 * 1024 * 1024
}
fn default_width() -> u32 {
    2560
}
fn default_height() -> u32 {
    1440
}
fn default_fov() -> f32 {
    40.0
}
fn default_move_step() -> f64 {
    5.0
}
fn default_rotate_step() -> f64 {
    45.0
}
fn default_command_pause() -> u64 {
    10
}
fn default_settle() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    20
}
fn default_retry_pause() -> u64 {
    500
}
fn default_ready_poll_interval() -> u64 {
    100
}
fn default_depth_floor() -> f32 {
    1e-8
}
fn default_max_depth() -> f32 {
    1000.0
}
fn default_xy_step() -> f64 {
    10.0
}
fn default_z_step() -> f64 {
    5.0
}
fn default_yaws() -> Vec<f64> {
    vec![0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0]
}
fn default_cloud_path() -> String {
    "output/scene_point_cloud.pcd".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
            chunk_size: default_chunk_size(),
            max_payload_bytes: default_max_payload(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fov_deg: default_fov(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            move_step: default_move_step(),
            rotate_step: default_rotate_step(),
            command_pause_ms: default_command_pause(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle(),
            max_attempts: default_max_attempts(),
            retry_pause_ms: default_retry_pause(),
            poll_ready: false,
            ready_poll_interval_ms: default_ready_poll_interval(),
            depth_floor: default_depth_floor(),
            max_depth: default_max_depth(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 0.0,
            x_step: default_xy_step(),
            y_min: 0.0,
            y_max: 0.0,
            y_step: default_xy_step(),
            z_min: 0.0,
            z_max: 0.0,
            z_step: default_z_step(),
            yaws: default_yaws(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cloud_path: default_cloud_path(),
            encoding: PcdEncoding::default(),
        }
    }
}

impl ConnectionConfig {
    /// Read timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

impl CaptureConfig {
    /// Depth truncation, `None` when disabled
    pub fn max_depth(&self) -> Option<f32> {
        (self.max_depth > 0.0).then_some(self.max_depth)
    }
}

impl DrishtiConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DrishtiError::Config(format!("Failed to read config file: {}", e)))?;
        let config: DrishtiConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the estimator or scan loops diverge
    pub fn validate(&self) -> Result<()> {
        if self.motion.move_step <= 0.0 || self.motion.rotate_step <= 0.0 {
            return Err(DrishtiError::Config(
                "motion steps must be positive".to_string(),
            ));
        }
        if self.scan.x_step <= 0.0 || self.scan.y_step <= 0.0 || self.scan.z_step <= 0.0 {
            return Err(DrishtiError::Config(
                "scan steps must be positive".to_string(),
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(DrishtiError::Config(
                "camera dimensions must be non-zero".to_string(),
            ));
        }
        if !(self.camera.fov_deg > 0.0 && self.camera.fov_deg < 180.0) {
            return Err(DrishtiError::Config(format!(
                "fov_deg must be in (0, 180), got {}",
                self.camera.fov_deg
            )));
        }
        if self.connection.chunk_size == 0 {
            return Err(DrishtiError::Config(
                "chunk_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the full address string for connection
    pub fn address(&self) -> String {
        format!("{}:{}", self.connection.host, self.connection.port)
    }
}
