//! Centering configuration.

use nalgebra::Vector3;
use scan_calib_fiducial::DetectParams;
use serde::{Deserialize, Serialize};

/// World axis a bounding-box edge can be assigned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Unit basis vector of the axis.
    pub fn basis(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

/// Configuration errors caught before any geometry work.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("max_dir and mid_dir must be different axes")]
    IdenticalAxes,
}

/// Configuration for [`center_mesh`](crate::center_mesh).
///
/// Serializes with serde, so a run's settings can be kept next to its
/// saved transform. Missing fields fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenteringConfig {
    /// Axis the longest bounding-box edge is mapped to (fallback method).
    pub max_dir: Axis,
    /// Axis the second longest bounding-box edge is mapped to.
    pub mid_dir: Axis,
    /// Invert the axis the longest edge is mapped to.
    pub flip_max: bool,
    /// Invert the axis the second longest edge is mapped to.
    pub flip_mid: bool,
    /// Snap sample-square directions to the nearest bounding-box edge.
    /// The raw marker directions are often less globally accurate.
    pub snap_to_obb: bool,
    /// Seed for the surface-normal vote of the fallback method.
    pub seed: u64,
    pub detect: DetectParams,
}

impl Default for CenteringConfig {
    fn default() -> Self {
        Self {
            max_dir: Axis::X,
            mid_dir: Axis::Y,
            flip_max: false,
            flip_mid: false,
            snap_to_obb: true,
            seed: 0,
            detect: DetectParams::default(),
        }
    }
}

impl CenteringConfig {
    /// The minor axis left over by the max/mid assignment.
    pub(crate) fn min_dir(&self) -> Axis {
        match (self.max_dir, self.mid_dir) {
            (Axis::X, Axis::Y) | (Axis::Y, Axis::X) => Axis::Z,
            (Axis::X, Axis::Z) | (Axis::Z, Axis::X) => Axis::Y,
            _ => Axis::X,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dir == self.mid_dir {
            return Err(ConfigError::IdenticalAxes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_axes_are_rejected() {
        let config = CenteringConfig {
            max_dir: Axis::Z,
            mid_dir: Axis::Z,
            ..CenteringConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IdenticalAxes)
        ));
        assert!(CenteringConfig::default().validate().is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = CenteringConfig {
            max_dir: Axis::Z,
            mid_dir: Axis::X,
            flip_mid: true,
            seed: 7,
            ..CenteringConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CenteringConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: CenteringConfig = serde_json::from_str(r#"{"max_dir":"Z"}"#).unwrap();
        assert_eq!(config.max_dir, Axis::Z);
        assert_eq!(config.mid_dir, Axis::Y);
        assert!(config.snap_to_obb);
        assert_eq!(config.detect, DetectParams::default());
    }

    #[test]
    fn min_dir_is_the_remaining_axis() {
        let mut config = CenteringConfig::default();
        assert_eq!(config.min_dir(), Axis::Z);
        config.mid_dir = Axis::Z;
        assert_eq!(config.min_dir(), Axis::Y);
        config.max_dir = Axis::Y;
        config.mid_dir = Axis::X;
        assert_eq!(config.min_dir(), Axis::Z);
    }
}
