//! Pose and command types for the simulated camera drone.

use crate::core::math::normalize_yaw;
use crate::error::DrishtiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Estimated drone pose in the world frame.
///
/// World frame: X forward at yaw 0°, Y at yaw 90°, Z up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Z position (altitude) in meters
    pub z: f64,
    /// Heading in degrees, normalized to [0, 360)
    pub yaw: f64,
}

impl Pose {
    /// Create a new pose with yaw normalized to [0, 360).
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: normalize_yaw(yaw),
        }
    }

    /// Origin with zero heading.
    #[inline]
    pub fn origin() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
        }
    }

    /// Position as an `[x, y, z]` array.
    #[inline]
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Coordinate along a world axis.
    #[inline]
    pub fn coordinate(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::origin()
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2}) yaw {:.2}°",
            self.x, self.y, self.z, self.yaw
        )
    }
}

/// World axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Heading that must be faced before FORWARD/BACKWARD moves along this axis.
    ///
    /// `None` for Z, which UP/DOWN adjust regardless of heading.
    pub fn facing_yaw(&self) -> Option<f64> {
        match self {
            Axis::X => Some(0.0),
            Axis::Y => Some(90.0),
            Axis::Z => None,
        }
    }
}

/// Fire-and-forget motion commands understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Forward,
    Backward,
    Up,
    Down,
    LeftRotate,
    RightRotate,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Forward,
        Command::Backward,
        Command::Up,
        Command::Down,
        Command::LeftRotate,
        Command::RightRotate,
    ];

    /// Wire text of the command (sent without delimiter).
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Forward => "FORWARD",
            Command::Backward => "BACKWARD",
            Command::Up => "UP",
            Command::Down => "DOWN",
            Command::LeftRotate => "LEFTROTATE",
            Command::RightRotate => "RIGHTROTATE",
        }
    }

    #[inline]
    pub fn is_rotation(&self) -> bool {
        matches!(self, Command::LeftRotate | Command::RightRotate)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = DrishtiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| DrishtiError::Parse(format!("unknown motion command: {:?}", s)))
    }
}

/// Data-returning requests (a response frame is expected, except for `Request`).
pub mod request {
    /// Ask the simulator to render a new RGBD capture (no response).
    pub const REQUEST: &str = "REQUEST";
    /// Fetch the last rendered capture as a combined RGB + depth payload.
    pub const CAPTURE: &str = "CAPTURE";
    /// Query capture readiness; answered with `READY` or `NOTREADY`.
    pub const CHECK: &str = "CHECK";
    /// Readiness reply once the requested capture is available.
    pub const READY: &str = "READY";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_new_normalizes_yaw() {
        let pose = Pose::new(1.0, 2.0, 3.0, -90.0);
        assert_eq!(pose.yaw, 270.0);
        assert_eq!(pose.position(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_command_round_trip_text() {
        for cmd in Command::ALL {
            assert_eq!(cmd.as_str().parse::<Command>().unwrap(), cmd);
        }
        assert!("LEFT".parse::<Command>().is_err());
    }

    #[test]
    fn test_facing_yaw() {
        assert_eq!(Axis::X.facing_yaw(), Some(0.0));
        assert_eq!(Axis::Y.facing_yaw(), Some(90.0));
        assert_eq!(Axis::Z.facing_yaw(), None);
    }
}
