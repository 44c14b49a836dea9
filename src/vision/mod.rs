//! Vision layer: frame decoding, camera model, and cloud reconstruction.

pub mod decoder;
pub mod intrinsics;
pub mod reconstruction;

pub use decoder::{DepthGrid, Frame, FrameDecoder, decode_depth, decode_rgb};
pub use intrinsics::Intrinsics;
pub use reconstruction::{
    ColoredPoint, DepthFilter, GlobalPointCloud, WorldTransform, back_project, to_world,
};
