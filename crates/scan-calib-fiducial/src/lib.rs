//! Sample-square fiducial detection.
//!
//! The sample square is a printed card carrying two small marker boards
//! with known physical geometry. This crate finds the card in a texture
//! image: it extracts dark quad candidates, decodes their marker codes
//! against two four-marker dictionaries, interpolates internal board
//! corners, and normalizes the detected keypoints for image mirroring
//! and camera roll.

pub mod board;
pub mod catalog;
pub mod detect;
pub mod dictionary;
pub mod matcher;

mod quads;
#[cfg(test)]
mod testutil;
mod threshold;

pub use board::{BoardLayout, DecodeParams, DetectedBoard, DetectedCorner, DetectedMarker};
pub use catalog::{catalog, corner_keypoint, marker_keypoint, KeypointCatalog, KEYPOINT_COUNT};
pub use detect::{detect_sample_square, DetectParams, FlipAxis, Keypoint, SampleSquareDetection};
pub use dictionary::{aruco_original_subset, Dictionary};
pub use matcher::{Match, Matcher};
