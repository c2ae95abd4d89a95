//! Centering transform and its JSON persistence.

use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Decomposed centering transform: `vertex' = scale * rotation *
/// (vertex + translation)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CenteringTransform {
    pub scale: f64,
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

/// Errors reading or writing a persisted transform.
#[derive(thiserror::Error, Debug)]
pub enum TransformIoError {
    #[error("transform i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("transform (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CenteringTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Homogeneous matrix, translation applied first, scale last.
    pub fn matrix(&self) -> Matrix4<f64> {
        Matrix4::new_scaling(self.scale)
            * self.rotation.to_homogeneous()
            * Matrix4::new_translation(&self.translation)
    }

    /// Write the transform as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TransformIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a transform previously written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TransformIoError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for CenteringTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Rotation3};

    #[test]
    fn matrix_applies_translation_then_rotation_then_scale() {
        let rotation = *Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3).matrix();
        let tfm = CenteringTransform {
            scale: 2.0,
            rotation,
            translation: Vector3::new(-1.0, 0.5, 0.0),
        };

        let p = Point3::new(3.0, -0.5, 1.0);
        let got = tfm.matrix().transform_point(&p);
        let want = (rotation * (p + tfm.translation)) * 2.0;
        assert_relative_eq!(got.coords, want.coords, epsilon = 1e-12);
    }

    #[test]
    fn json_round_trip_is_exact() {
        let tfm = CenteringTransform {
            scale: 0.0213456789,
            rotation: *Rotation3::from_axis_angle(&Vector3::x_axis(), 1.234).matrix(),
            translation: Vector3::new(1.0 / 3.0, -2.5e-7, 42.0),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centering.json");
        tfm.save(&path).unwrap();
        let loaded = CenteringTransform::load(&path).unwrap();
        assert_eq!(tfm, loaded);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CenteringTransform::load("/nonexistent/centering.json");
        assert!(matches!(err, Err(TransformIoError::Io(_))));
    }
}
