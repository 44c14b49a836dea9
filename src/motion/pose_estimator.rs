//! Dead-reckoning pose estimator for the simulated drone.
//!
//! Integrates the discrete motion commands sent to the simulator into an
//! estimated pose. The simulator's true pose is never queried, so error
//! accumulates additively with the number of issued steps and nothing
//! corrects it. This is a known limitation of the open-loop design.
//!
//! Motion model:
//! - UP/DOWN: `z ± move_step`, independent of heading
//! - LEFTROTATE/RIGHTROTATE: `yaw ∓ rotate_step`, wrapped to [0, 360)
//! - FORWARD/BACKWARD: `± move_step` added straight to the world axis the
//!   heading is aligned with (0° → +X, 90° → +Y, 180° → −X, 270° → −Y)

use crate::config::MotionConfig;
use crate::core::math::{normalize_yaw, shortest_yaw_delta};
use crate::core::{Axis, Command, Pose};

/// Headings within this many degrees of a cardinal direction count as aligned.
const CARDINAL_TOLERANCE_DEG: f64 = 1e-6;

/// Dead-reckoning state machine over [`Command`]s.
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    /// Distance per translation command in meters
    move_step: f64,
    /// Angle per rotation command in degrees
    rotate_step: f64,
    /// Current estimated pose
    pose: Pose,
    /// Number of commands integrated so far
    commands_applied: u64,
}

impl PoseEstimator {
    /// Create an estimator at the origin with zero yaw.
    ///
    /// # Arguments
    /// * `move_step` - Meters per FORWARD/BACKWARD/UP/DOWN (simulator: 5.0)
    /// * `rotate_step` - Degrees per LEFTROTATE/RIGHTROTATE (simulator: 45.0)
    pub fn new(move_step: f64, rotate_step: f64) -> Self {
        Self::with_pose(move_step, rotate_step, Pose::origin())
    }

    /// Create an estimator starting from a known pose.
    pub fn with_pose(move_step: f64, rotate_step: f64, pose: Pose) -> Self {
        Self {
            move_step,
            rotate_step,
            pose: Pose::new(pose.x, pose.y, pose.z, pose.yaw),
            commands_applied: 0,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.move_step, config.rotate_step)
    }

    /// Integrate one command that has been delivered to the simulator.
    ///
    /// # Returns
    /// The updated pose
    pub fn apply(&mut self, command: Command) -> Pose {
        let mut next = self.pose;
        match command {
            Command::Up => next.z += self.move_step,
            Command::Down => next.z -= self.move_step,
            Command::RightRotate => next.yaw = normalize_yaw(next.yaw + self.rotate_step),
            Command::LeftRotate => next.yaw = normalize_yaw(next.yaw - self.rotate_step),
            Command::Forward => self.translate_along_heading(&mut next, self.move_step),
            Command::Backward => self.translate_along_heading(&mut next, -self.move_step),
        }
        // Single assignment so a command is never half-applied
        self.pose = next;
        self.commands_applied += 1;
        self.pose
    }

    /// Get the current pose (a snapshot, not a live view).
    #[inline]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    #[inline]
    pub fn commands_applied(&self) -> u64 {
        self.commands_applied
    }

    #[inline]
    pub fn move_step(&self) -> f64 {
        self.move_step
    }

    #[inline]
    pub fn rotate_step(&self) -> f64 {
        self.rotate_step
    }

    /// Rotation commands that bring the heading to `target_yaw`.
    ///
    /// The target is wrapped to [0, 360) and the shortest signed delta in
    /// (−180, 180] is consumed one `rotate_step` at a time until it is within
    /// half a step. Positive deltas use RIGHTROTATE.
    pub fn plan_rotation(&self, target_yaw: f64) -> Vec<Command> {
        let mut delta = shortest_yaw_delta(self.pose.yaw, target_yaw);
        let mut plan = Vec::new();
        while delta.abs() > self.rotate_step / 2.0 {
            if delta > 0.0 {
                plan.push(Command::RightRotate);
                delta -= self.rotate_step;
            } else {
                plan.push(Command::LeftRotate);
                delta += self.rotate_step;
            }
        }
        plan
    }

    /// Translation commands that bring the coordinate on `axis` within half a
    /// step of `target`.
    ///
    /// For X and Y the heading must already face [`Axis::facing_yaw`], so that
    /// FORWARD increases the coordinate. Z uses UP/DOWN at any heading.
    pub fn plan_translation(&self, axis: Axis, target: f64) -> Vec<Command> {
        let (increase, decrease) = match axis {
            Axis::Z => (Command::Up, Command::Down),
            Axis::X | Axis::Y => (Command::Forward, Command::Backward),
        };

        let mut current = self.pose.coordinate(axis);
        let mut plan = Vec::new();
        while (target - current).abs() > self.move_step / 2.0 {
            if target > current {
                plan.push(increase);
                current += self.move_step;
            } else {
                plan.push(decrease);
                current -= self.move_step;
            }
        }
        plan
    }

    /// Whether the heading is aligned with the axis FORWARD moves along.
    pub fn is_facing(&self, axis: Axis) -> bool {
        match axis.facing_yaw() {
            Some(yaw) => shortest_yaw_delta(self.pose.yaw, yaw).abs() <= CARDINAL_TOLERANCE_DEG,
            None => true,
        }
    }

    fn translate_along_heading(&self, pose: &mut Pose, distance: f64) {
        let quarter = pose.yaw / 90.0;
        let nearest = quarter.round();
        if ((quarter - nearest) * 90.0).abs() <= CARDINAL_TOLERANCE_DEG {
            match (nearest as i64).rem_euclid(4) {
                0 => pose.x += distance,
                1 => pose.y += distance,
                2 => pose.x -= distance,
                _ => pose.y -= distance,
            }
        } else {
            // Off-cardinal headings project the step onto both axes
            let (sin_y, cos_y) = pose.yaw.to_radians().sin_cos();
            pose.x += distance * cos_y;
            pose.y += distance * sin_y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_starts_at_origin() {
        let est = PoseEstimator::new(5.0, 45.0);
        assert_eq!(est.pose(), Pose::origin());
        assert_eq!(est.commands_applied(), 0);
    }

    #[test]
    fn test_up_down_ignore_heading() {
        let mut est = PoseEstimator::with_pose(5.0, 45.0, Pose::new(0.0, 0.0, 0.0, 135.0));
        est.apply(Command::Up);
        est.apply(Command::Up);
        let pose = est.apply(Command::Down);
        assert_relative_eq!(pose.z, 5.0);
        assert_relative_eq!(pose.x, 0.0);
        assert_relative_eq!(pose.y, 0.0);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut est = PoseEstimator::new(5.0, 45.0);
        let pose = est.apply(Command::LeftRotate);
        assert_relative_eq!(pose.yaw, 315.0);
        for _ in 0..2 {
            est.apply(Command::RightRotate);
        }
        assert_relative_eq!(est.pose().yaw, 45.0);
    }

    #[test]
    fn test_forward_follows_cardinal_axis() {
        let cases = [
            (0.0, (5.0, 0.0)),
            (90.0, (0.0, 5.0)),
            (180.0, (-5.0, 0.0)),
            (270.0, (0.0, -5.0)),
        ];
        for (yaw, (dx, dy)) in cases {
            let mut est = PoseEstimator::with_pose(5.0, 45.0, Pose::new(0.0, 0.0, 0.0, yaw));
            let pose = est.apply(Command::Forward);
            // Exact add, no trigonometric residue
            assert_eq!(pose.x, dx, "yaw {}", yaw);
            assert_eq!(pose.y, dy, "yaw {}", yaw);
        }
    }

    #[test]
    fn test_backward_at_yaw_90_decreases_y() {
        let mut est = PoseEstimator::with_pose(5.0, 45.0, Pose::new(0.0, 10.0, 0.0, 90.0));
        let pose = est.apply(Command::Backward);
        assert_eq!(pose.y, 5.0);
        assert_eq!(pose.x, 0.0);
    }

    #[test]
    fn test_forward_off_cardinal_projects() {
        let mut est = PoseEstimator::with_pose(2.0, 45.0, Pose::new(0.0, 0.0, 0.0, 45.0));
        let pose = est.apply(Command::Forward);
        assert_relative_eq!(pose.x, 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(pose.y, 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_plan_rotation_shortest_direction() {
        let est = PoseEstimator::new(5.0, 45.0);
        assert_eq!(
            est.plan_rotation(90.0),
            vec![Command::RightRotate, Command::RightRotate]
        );
        assert_eq!(
            est.plan_rotation(270.0),
            vec![Command::LeftRotate, Command::LeftRotate]
        );
        assert!(est.plan_rotation(10.0).is_empty());
    }

    #[test]
    fn test_plan_rotation_half_step_tolerance() {
        let est = PoseEstimator::new(5.0, 45.0);
        // 22.5 is exactly half a step: already close enough
        assert!(est.plan_rotation(22.5).is_empty());
        assert_eq!(est.plan_rotation(23.0), vec![Command::RightRotate]);
    }

    #[test]
    fn test_plan_translation_z() {
        let est = PoseEstimator::new(5.0, 45.0);
        assert_eq!(
            est.plan_translation(Axis::Z, 10.0),
            vec![Command::Up, Command::Up]
        );
        assert_eq!(est.plan_translation(Axis::Z, -7.0), vec![Command::Down]);
        assert!(est.plan_translation(Axis::Z, 2.5).is_empty());
    }

    #[test]
    fn test_plan_translation_x_backward() {
        let est = PoseEstimator::new(5.0, 45.0);
        assert_eq!(
            est.plan_translation(Axis::X, -15.0),
            vec![Command::Backward; 3]
        );
    }

    #[test]
    fn test_is_facing() {
        let mut est = PoseEstimator::new(5.0, 45.0);
        assert!(est.is_facing(Axis::X));
        assert!(!est.is_facing(Axis::Y));
        est.apply(Command::RightRotate);
        est.apply(Command::RightRotate);
        assert!(est.is_facing(Axis::Y));
        assert!(est.is_facing(Axis::Z));
    }
}
