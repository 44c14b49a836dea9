//! Core foundation layer.
//!
//! No internal dependencies; every other layer builds on these types.
//!
//! # Contents
//!
//! - [`pose`]: Estimated drone pose and the discrete motion command vocabulary
//! - [`math`]: Yaw normalization and shortest-delta arithmetic (degrees)

pub mod math;
pub mod pose;

pub use pose::{Axis, Command, Pose};
