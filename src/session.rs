//! Capture session: motion, capture retry, and cloud accumulation.
//!
//! Every motion command goes over the link first and is mirrored into the
//! [`PoseEstimator`] only once it was delivered. Captures run strictly one at
//! a time after all pending motion, and each one back-projects against the
//! pose snapshot taken when its payload arrived.

use crate::config::{CaptureConfig, DrishtiConfig};
use crate::core::pose::request;
use crate::core::{Axis, Command, Pose};
use crate::error::{DrishtiError, Result};
use crate::io::SimulatorLink;
use crate::motion::PoseEstimator;
use crate::vision::{
    DepthFilter, FrameDecoder, GlobalPointCloud, Intrinsics, back_project, to_world,
};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded retry for capture attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// `None` retries until success
    pub max_attempts: Option<u32>,
    /// Pause between failed attempts
    pub pause: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            max_attempts: (config.max_attempts > 0).then_some(config.max_attempts),
            pause: Duration::from_millis(config.retry_pause_ms),
        }
    }

    /// Whether another attempt may follow `attempts` failed ones.
    #[inline]
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

/// Outcome of one successful capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureReport {
    /// Pose the points were placed with
    pub pose: Pose,
    pub points_added: usize,
    pub total_points: usize,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// How the session waits between REQUEST and CAPTURE.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ReadyWait {
    Settle(Duration),
    Poll(Duration),
}

/// Single-actor orchestrator over a [`SimulatorLink`].
pub struct CaptureSession<L: SimulatorLink> {
    link: L,
    estimator: PoseEstimator,
    decoder: FrameDecoder,
    intrinsics: Intrinsics,
    filter: DepthFilter,
    retry: RetryPolicy,
    ready_wait: ReadyWait,
    command_pause: Duration,
    cloud: GlobalPointCloud,
}

impl<L: SimulatorLink> CaptureSession<L> {
    /// Start a session at the origin with zero yaw and an empty cloud.
    pub fn new(link: L, config: &DrishtiConfig) -> Self {
        let capture = &config.capture;
        let ready_wait = if capture.poll_ready {
            ReadyWait::Poll(Duration::from_millis(capture.ready_poll_interval_ms))
        } else {
            ReadyWait::Settle(Duration::from_millis(capture.settle_ms))
        };
        Self {
            link,
            estimator: PoseEstimator::from_config(&config.motion),
            decoder: FrameDecoder::from_config(&config.camera),
            intrinsics: Intrinsics::from_config(&config.camera),
            filter: DepthFilter::from_config(capture),
            retry: RetryPolicy::from_config(capture),
            ready_wait,
            command_pause: Duration::from_millis(config.motion.command_pause_ms),
            cloud: GlobalPointCloud::new(),
        }
    }

    /// Replace the estimator, e.g. to start from a known pose.
    pub fn with_estimator(mut self, estimator: PoseEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Current estimated pose.
    #[inline]
    pub fn pose(&self) -> Pose {
        self.estimator.pose()
    }

    pub fn estimator(&self) -> &PoseEstimator {
        &self.estimator
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn cloud(&self) -> &GlobalPointCloud {
        &self.cloud
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Finish the session, handing back the accumulated cloud.
    pub fn into_cloud(self) -> GlobalPointCloud {
        self.cloud
    }

    /// Send one motion command and mirror it into the estimator.
    ///
    /// The estimator is untouched if the send fails.
    pub fn issue(&mut self, command: Command) -> Result<Pose> {
        self.link.send_command(command.as_str())?;
        let pose = self.estimator.apply(command);
        debug!("Issued {} -> {}", command, pose);
        pause(self.command_pause);
        Ok(pose)
    }

    fn issue_all(&mut self, commands: Vec<Command>) -> Result<Pose> {
        for command in commands {
            self.issue(command)?;
        }
        Ok(self.pose())
    }

    /// Rotate in `rotate_step` increments until within half a step of `target_yaw`.
    pub fn rotate_to_yaw(&mut self, target_yaw: f64) -> Result<Pose> {
        let plan = self.estimator.plan_rotation(target_yaw);
        self.issue_all(plan)
    }

    /// Drive to `(x, y, z)`: altitude first, then X facing 0°, then Y facing 90°.
    pub fn move_to_position(&mut self, x: f64, y: f64, z: f64) -> Result<Pose> {
        let plan = self.estimator.plan_translation(Axis::Z, z);
        self.issue_all(plan)?;

        for (axis, target) in [(Axis::X, x), (Axis::Y, y)] {
            if let Some(yaw) = axis.facing_yaw() {
                self.rotate_to_yaw(yaw)?;
            }
            let plan = self.estimator.plan_translation(axis, target);
            self.issue_all(plan)?;
        }

        let pose = self.pose();
        info!("Reached {}", pose);
        Ok(pose)
    }

    /// Poll `CHECK` until the simulator answers `READY`.
    ///
    /// Bounded by the retry policy's attempt limit.
    pub fn wait_ready(&mut self, interval: Duration) -> Result<()> {
        let mut polls = 0u32;
        loop {
            polls += 1;
            let reply = self.link.fetch_string(request::CHECK)?;
            if reply.as_deref().map(str::trim) == Some(request::READY) {
                debug!("Capture ready after {} checks", polls);
                return Ok(());
            }
            if !self.retry.allows_retry(polls) {
                return Err(DrishtiError::NotReady { polls });
            }
            pause(interval);
        }
    }

    /// Capture at the current pose and merge the points into the cloud.
    ///
    /// Any failed attempt (transport, framing, empty reply, decode, shape) is
    /// retried after the policy's pause until the attempt limit is reached.
    pub fn capture(&mut self) -> Result<CaptureReport> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.capture_once() {
                Ok(mut report) => {
                    report.attempts = attempts;
                    info!(
                        "Captured {} points at {} (total {}, attempt {})",
                        report.points_added, report.pose, report.total_points, attempts
                    );
                    return Ok(report);
                }
                Err(e) if self.retry.allows_retry(attempts) => {
                    warn!("Capture attempt {} failed: {}", attempts, e);
                    pause(self.retry.pause);
                }
                Err(e) => {
                    return Err(DrishtiError::RetriesExhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
            }
        }
    }

    fn capture_once(&mut self) -> Result<CaptureReport> {
        self.link.send_command(request::REQUEST)?;
        match self.ready_wait {
            ReadyWait::Settle(settle) => pause(settle),
            ReadyWait::Poll(interval) => self.wait_ready(interval)?,
        }

        let payload = self
            .link
            .fetch_payload(request::CAPTURE)?
            .ok_or_else(|| DrishtiError::NoData {
                command: request::CAPTURE.to_string(),
            })?;
        let frame = self.decoder.decode(&payload)?;

        let pose = self.estimator.pose();
        let camera_points = back_project(&frame, &self.intrinsics, &self.filter)?;
        let world_points = to_world(camera_points, &pose);
        let points_added = world_points.len();
        let total_points = self.cloud.merge(world_points);

        Ok(CaptureReport {
            pose,
            points_added,
            total_points,
            attempts: 0,
        })
    }
}

#[inline]
fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RgbdPayload;
    use approx::assert_relative_eq;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Link that records traffic and replays scripted replies.
    #[derive(Default)]
    struct ScriptedLink {
        sent: Vec<String>,
        payloads: VecDeque<Result<Option<RgbdPayload>>>,
        strings: VecDeque<Option<String>>,
    }

    impl SimulatorLink for ScriptedLink {
        fn send_command(&mut self, command: &str) -> Result<()> {
            self.sent.push(command.to_string());
            Ok(())
        }

        fn fetch_payload(&mut self, command: &str) -> Result<Option<RgbdPayload>> {
            self.sent.push(command.to_string());
            self.payloads.pop_front().unwrap_or(Ok(None))
        }

        fn fetch_string(&mut self, command: &str) -> Result<Option<String>> {
            self.sent.push(command.to_string());
            Ok(self.strings.pop_front().flatten())
        }
    }

    fn test_config() -> DrishtiConfig {
        let mut config = DrishtiConfig::default();
        config.camera.width = 2;
        config.camera.height = 2;
        config.camera.fov_deg = 90.0;
        config.motion.command_pause_ms = 0;
        config.capture.settle_ms = 0;
        config.capture.retry_pause_ms = 0;
        config.capture.ready_poll_interval_ms = 0;
        config.capture.max_attempts = 3;
        config
    }

    fn payload() -> RgbdPayload {
        let img = RgbImage::from_pixel(2, 2, Rgb([200, 100, 50]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        RgbdPayload {
            rgb: cursor.into_inner(),
            depth: [0.5f32; 4].iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn sent(session: &CaptureSession<ScriptedLink>) -> Vec<&str> {
        session.link().sent.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_move_to_position_sequence() {
        let mut session = CaptureSession::new(ScriptedLink::default(), &test_config());
        let pose = session.move_to_position(10.0, 5.0, 5.0).unwrap();

        assert_eq!(
            sent(&session),
            ["UP", "FORWARD", "FORWARD", "RIGHTROTATE", "RIGHTROTATE", "FORWARD"]
        );
        assert_relative_eq!(pose.x, 10.0);
        assert_relative_eq!(pose.y, 5.0);
        assert_relative_eq!(pose.z, 5.0);
        assert_relative_eq!(pose.yaw, 90.0);
        assert_eq!(session.estimator().commands_applied(), 6);
    }

    #[test]
    fn test_rotate_to_yaw_takes_short_way() {
        let mut session = CaptureSession::new(ScriptedLink::default(), &test_config());
        let pose = session.rotate_to_yaw(270.0).unwrap();
        assert_eq!(sent(&session), ["LEFTROTATE", "LEFTROTATE"]);
        assert_relative_eq!(pose.yaw, 270.0);
    }

    #[test]
    fn test_capture_merges_points() {
        let mut link = ScriptedLink::default();
        link.payloads.push_back(Ok(Some(payload())));
        let mut session = CaptureSession::new(link, &test_config());

        let report = session.capture().unwrap();
        assert_eq!(sent(&session), ["REQUEST", "CAPTURE"]);
        assert_eq!(report.points_added, 4);
        assert_eq!(report.total_points, 4);
        assert_eq!(report.attempts, 1);
        assert_eq!(session.cloud().len(), 4);
        // depth 0.5 inverts to 2 m straight ahead along world X
        for p in session.cloud().iter() {
            assert_relative_eq!(p.position.x, 2.0, epsilon = 1e-5);
            assert_eq!(p.color, [200, 100, 50]);
        }
    }

    #[test]
    fn test_capture_retries_empty_reply() {
        let mut link = ScriptedLink::default();
        link.payloads.push_back(Ok(None));
        link.payloads.push_back(Ok(Some(payload())));
        let mut session = CaptureSession::new(link, &test_config());

        let report = session.capture().unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(sent(&session), ["REQUEST", "CAPTURE", "REQUEST", "CAPTURE"]);
    }

    #[test]
    fn test_capture_retries_decode_failure() {
        let mut link = ScriptedLink::default();
        let mut broken = payload();
        broken.rgb = b"not an image".to_vec();
        link.payloads.push_back(Ok(Some(broken)));
        link.payloads.push_back(Ok(Some(payload())));
        let mut session = CaptureSession::new(link, &test_config());
        assert_eq!(session.capture().unwrap().attempts, 2);
    }

    #[test]
    fn test_capture_exhausts_retries() {
        let mut session = CaptureSession::new(ScriptedLink::default(), &test_config());
        let err = session.capture().unwrap_err();
        match err {
            DrishtiError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, DrishtiError::NoData { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(session.cloud().is_empty());
    }

    #[test]
    fn test_capture_uses_pose_at_capture_time() {
        let mut link = ScriptedLink::default();
        link.payloads.push_back(Ok(Some(payload())));
        let mut session = CaptureSession::new(link, &test_config());
        session.issue(Command::Up).unwrap();

        let report = session.capture().unwrap();
        session.issue(Command::Up).unwrap();

        assert_relative_eq!(report.pose.z, 5.0);
        // the two pixel rows land 2 m apart, the lower one level with the camera
        let min_z = session
            .cloud()
            .iter()
            .map(|p| p.position.z)
            .fold(f32::INFINITY, f32::min);
        assert_relative_eq!(min_z, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_poll_ready_before_capture() {
        let mut config = test_config();
        config.capture.poll_ready = true;
        let mut link = ScriptedLink::default();
        link.strings.push_back(Some("NOTREADY".into()));
        link.strings.push_back(Some("READY".into()));
        link.payloads.push_back(Ok(Some(payload())));
        let mut session = CaptureSession::new(link, &config);

        session.capture().unwrap();
        assert_eq!(sent(&session), ["REQUEST", "CHECK", "CHECK", "CAPTURE"]);
    }

    #[test]
    fn test_retry_policy_unbounded() {
        let mut capture = CaptureConfig::default();
        capture.max_attempts = 0;
        let policy = RetryPolicy::from_config(&capture);
        assert_eq!(policy.max_attempts, None);
        assert!(policy.allows_retry(u32::MAX - 1));
    }
}
