//! High-level facade crate for the `scan-calib-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying geometry and fiducial
//!   crates
//! - the centering pipeline: sample-square calibration with a bounding-box
//!   fallback, producing a scale/rotation/translation transform
//! - mesh cleanup helpers for ground-plane removal and small-component
//!   filtering
//!
//! ## Quickstart
//!
//! ```no_run
//! use scan_calib::{center_mesh, CenteringConfig};
//! use scan_calib::mesh::Mesh;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut mesh = Mesh::default();
//! // ... fill the mesh from a loaded scan ...
//! let config = CenteringConfig::default();
//! let result = center_mesh(&mut mesh, None, &config)?;
//! result.transform.save("centering.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `scan_calib::core`: grayscale images, homographies, rotation solvers.
//! - `scan_calib::mesh`: mesh store, editor, components, OBB, plane RANSAC.
//! - `scan_calib::fiducial`: sample-square markers, catalog, detection.
//! - top level: `center_mesh`, `remove_ground_plane`,
//!   `filter_small_components`, `CenteringTransform` persistence.

pub use scan_calib_core as core;
pub use scan_calib_fiducial as fiducial;
pub use scan_calib_mesh as mesh;

mod calibrate;
mod cleanup;
mod config;
mod transform;

pub use calibrate::{center_mesh, CalibrationError, CenteringResult};
pub use cleanup::{filter_small_components, remove_ground_plane};
pub use config::{Axis, CenteringConfig, ConfigError};
pub use transform::{CenteringTransform, TransformIoError};
