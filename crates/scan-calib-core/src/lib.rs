//! Core image and geometry types for scan calibration.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete image codec or mesh representation:
//! - owned/borrowed grayscale buffers with flip and quarter-turn helpers,
//! - planar homography estimation (4-point exact and normalized DLT),
//! - the minimal-rotation solver used for mesh orientation,
//! - a minimal `log` backend.

mod homography;
mod image;
mod logger;
mod rotation;

pub use homography::{estimate_homography, Homography};
pub use image::{GrayImage, GrayImageView, QuarterTurn};
pub use logger::init_with_level;
pub use rotation::align_rotation;
