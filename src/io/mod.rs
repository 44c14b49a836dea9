//! I/O and infrastructure layer.
//!
//! # Contents
//!
//! - [`frame_channel`]: Simulator TCP channel and length-prefixed wire format
//! - [`pcd`]: Point cloud export

pub mod frame_channel;
pub mod pcd;

pub use frame_channel::{FrameChannel, RgbdPayload, SimulatorLink};
pub use pcd::{PcdEncoding, save_pcd, write_pcd};
