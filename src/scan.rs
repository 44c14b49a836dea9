//! Grid scan driver.
//!
//! Visits every `(x, y, z)` cell of an inclusive grid (X outermost, Z
//! innermost) and captures once per configured heading at each cell.

use crate::config::ScanConfig;
use crate::error::{DrishtiError, Result};
use crate::io::SimulatorLink;
use crate::session::CaptureSession;
use tracing::{info, warn};

/// Slack so that `max` survives accumulated float error in `(max - min) / step`.
const RANGE_EPSILON: f64 = 1e-9;

/// Inclusive arithmetic range `min, min + step, ...` up to and including `max`.
///
/// Empty when `max < min` or `step` is not positive.
pub fn inclusive_range(min: f64, max: f64, step: f64) -> Vec<f64> {
    if step.is_nan() || step <= 0.0 || max < min {
        return Vec::new();
    }
    let count = ((max - min) / step + RANGE_EPSILON).floor() as usize;
    (0..=count).map(|i| min + i as f64 * step).collect()
}

/// Grid positions and headings to visit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    xs: Vec<f64>,
    ys: Vec<f64>,
    zs: Vec<f64>,
    yaws: Vec<f64>,
}

/// Totals over one scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub cells: usize,
    pub captures: usize,
    pub failed_captures: usize,
    pub total_points: usize,
}

impl ScanPlan {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, zs: Vec<f64>, yaws: Vec<f64>) -> Self {
        Self { xs, ys, zs, yaws }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            inclusive_range(config.x_min, config.x_max, config.x_step),
            inclusive_range(config.y_min, config.y_max, config.y_step),
            inclusive_range(config.z_min, config.z_max, config.z_step),
            config.yaws.clone(),
        )
    }

    /// Grid cells in visiting order.
    pub fn cells(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.xs.iter().flat_map(move |&x| {
            self.ys
                .iter()
                .flat_map(move |&y| self.zs.iter().map(move |&z| (x, y, z)))
        })
    }

    pub fn yaws(&self) -> &[f64] {
        &self.yaws
    }

    pub fn cell_count(&self) -> usize {
        self.xs.len() * self.ys.len() * self.zs.len()
    }

    /// Total captures a full run performs.
    pub fn capture_count(&self) -> usize {
        self.cell_count() * self.yaws.len()
    }

    /// Drive `session` through the plan.
    ///
    /// A capture that exhausts its retries is logged and skipped; motion
    /// failures abort the run since the estimated pose can no longer be trusted
    /// to match the simulator.
    pub fn run<L: SimulatorLink>(&self, session: &mut CaptureSession<L>) -> Result<ScanSummary> {
        info!(
            "Scanning {} cells x {} headings",
            self.cell_count(),
            self.yaws.len()
        );
        let mut summary = ScanSummary::default();

        for (x, y, z) in self.cells() {
            session.move_to_position(x, y, z)?;
            summary.cells += 1;

            for &yaw in &self.yaws {
                session.rotate_to_yaw(yaw)?;
                match session.capture() {
                    Ok(report) => {
                        summary.captures += 1;
                        summary.total_points = report.total_points;
                    }
                    Err(e @ DrishtiError::RetriesExhausted { .. }) => {
                        warn!(
                            "Skipping ({:.2}, {:.2}, {:.2}) yaw {:.2}: {}",
                            x, y, z, yaw, e
                        );
                        summary.failed_captures += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        summary.total_points = session.cloud().len();
        info!(
            "Scan finished: {} captures, {} failed, {} points",
            summary.captures, summary.failed_captures, summary.total_points
        );
        Ok(summary)
    }
}
