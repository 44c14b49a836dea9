//! Motion layer: dead reckoning over the simulator's command vocabulary.

pub mod pose_estimator;

pub use pose_estimator::PoseEstimator;
