//! Rigid rotations used for orientation search.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Rotation3, Vector3};

use crate::error::{TopologyError, TopologyResult};

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z (build) axis.
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        f.write_str(name)
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            other => Err(format!("unknown axis '{other}'")),
        }
    }
}

/// Right-handed rotation by `angle` radians about `axis`.
///
/// Only X and Y are supported: a turn about the build axis does not change
/// any overhang angle.
///
/// # Errors
///
/// Returns [`TopologyError::UnsupportedAxis`] for [`Axis::Z`].
///
/// # Example
///
/// ```
/// use mesh_topology::{rotation_about, Axis, Point3};
///
/// let r = rotation_about(Axis::X, std::f64::consts::FRAC_PI_2).unwrap();
/// let p = r * Point3::new(0.0, 1.0, 0.0);
/// assert!((p.z - 1.0).abs() < 1e-12);
///
/// assert!(rotation_about(Axis::Z, 1.0).is_err());
/// ```
pub fn rotation_about(axis: Axis, angle: f64) -> TopologyResult<Rotation3<f64>> {
    match axis {
        Axis::X => Ok(Rotation3::from_axis_angle(&Vector3::x_axis(), angle)),
        Axis::Y => Ok(Rotation3::from_axis_angle(&Vector3::y_axis(), angle)),
        Axis::Z => Err(TopologyError::UnsupportedAxis { axis }),
    }
}

/// Rotation about X by `x`, then about Y by `y` (`R_y · R_x`).
#[must_use]
pub fn orientation_rotation(x: f64, y: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), y)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), x)
}
