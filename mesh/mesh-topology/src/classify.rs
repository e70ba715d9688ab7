//! Overhang classification and the support-cost weight model.
//!
//! A face is measured by the angle between its unit normal and straight down.
//! Angles below `phi_min` are overhangs unless the face rests on the bed or
//! sits inside the tolerance band around `phi_min`.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use nalgebra::{Point3, Vector3};

/// Options that drive [`classify`].
///
/// # Example
///
/// ```
/// use mesh_topology::ClassifyParams;
///
/// let params = ClassifyParams::default().with_phi_min(0.6);
/// assert!((params.phi_min - 0.6).abs() < f64::EPSILON);
/// assert!(!params.ignore_grounded);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClassifyParams {
    /// Minimum printable overhang angle in radians.
    pub phi_min: f64,
    /// Treat faces touching the bed like any other face.
    pub ignore_grounded: bool,
    /// Max Z distance from the ground level for a vertex to touch the bed.
    pub ground_tolerance: f64,
    /// Faces within this many radians of `phi_min` are accepted.
    pub angle_tolerance: f64,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            phi_min: FRAC_PI_4,
            ignore_grounded: false,
            ground_tolerance: 0.01,
            angle_tolerance: 0.017, // ~1 degree
        }
    }
}

impl ClassifyParams {
    /// Set the minimum overhang angle.
    #[must_use]
    pub const fn with_phi_min(mut self, phi_min: f64) -> Self {
        self.phi_min = phi_min;
        self
    }

    /// Set whether bed contact is ignored.
    #[must_use]
    pub const fn with_ignore_grounded(mut self, ignore: bool) -> Self {
        self.ignore_grounded = ignore;
        self
    }
}

/// Outcome of classifying a single face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Angle between the unit normal and `(0, 0, -1)`, in radians.
    pub angle: f64,
    /// All three vertices lie within tolerance of the ground level.
    pub grounded: bool,
    /// The face is an unsupported overhang.
    pub problematic: bool,
}

/// Angle between a unit normal and straight down.
///
/// Returns `π/2` for a zero vector, so degenerate faces read as vertical.
#[must_use]
pub fn overhang_angle(unit_normal: &Vector3<f64>) -> f64 {
    if unit_normal.norm_squared() == 0.0 {
        return FRAC_PI_2;
    }
    let down = Vector3::new(0.0, 0.0, -1.0);
    unit_normal.dot(&down).clamp(-1.0, 1.0).acos()
}

/// True if every corner is within `tolerance` of `ground_level` on Z.
#[must_use]
pub fn is_grounded(corners: &[Point3<f64>; 3], ground_level: f64, tolerance: f64) -> bool {
    corners
        .iter()
        .all(|p| (p.z - ground_level).abs() <= tolerance)
}

/// Area of the triangle projected onto the XY plane.
#[must_use]
pub fn projected_area(corners: &[Point3<f64>; 3]) -> f64 {
    let e1 = corners[1] - corners[0];
    let e2 = corners[2] - corners[0];
    (e1.x * e2.y - e1.y * e2.x).abs() / 2.0
}

/// Classify a face from its unit normal and corner positions.
///
/// # Example
///
/// ```
/// use mesh_topology::{classify, ClassifyParams, Point3, Vector3};
///
/// let corners = [
///     Point3::new(0.0, 0.0, 5.0),
///     Point3::new(1.0, 0.0, 5.0),
///     Point3::new(0.0, 1.0, 5.0),
/// ];
/// let down = Vector3::new(0.0, 0.0, -1.0);
/// let result = classify(&down, &corners, 0.0, &ClassifyParams::default());
///
/// assert!(result.angle.abs() < 1e-12);
/// assert!(result.problematic);
/// ```
#[must_use]
pub fn classify(
    unit_normal: &Vector3<f64>,
    corners: &[Point3<f64>; 3],
    ground_level: f64,
    params: &ClassifyParams,
) -> Classification {
    let angle = overhang_angle(unit_normal);
    let grounded = is_grounded(corners, ground_level, params.ground_tolerance);

    let problematic = if (0.0..params.phi_min).contains(&angle) {
        if grounded && !params.ignore_grounded {
            false
        } else {
            (angle - params.phi_min).abs() >= params.angle_tolerance
        }
    } else {
        false
    };

    Classification {
        angle,
        grounded,
        problematic,
    }
}

/// Piecewise-linear support-cost model, in cost units per unit of projected
/// area.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightModel {
    /// Faces below this angle count as flat.
    pub flat_angle: f64,
    /// Cost of a flat, floating face.
    pub flat_cost: f64,
    /// Cost of a flat face resting on the bed (negative: a bonus).
    pub grounded_flat_cost: f64,
    /// Intercept of the overhang ramp, `flat_angle <= angle < phi_min`.
    pub overhang_intercept: f64,
    /// Slope of the overhang ramp.
    pub overhang_slope: f64,
    /// Intercept of the shallow ramp, `phi_min <= angle < π/2 - flat_angle`.
    pub shallow_intercept: f64,
    /// Slope of the shallow ramp.
    pub shallow_slope: f64,
}

impl Default for WeightModel {
    fn default() -> Self {
        Self {
            flat_angle: 0.087, // ~5 degrees
            flat_cost: 100.0,
            grounded_flat_cost: -80.0,
            overhang_intercept: 63.74,
            overhang_slope: 42.96,
            shallow_intercept: 21.23,
            shallow_slope: 14.3,
        }
    }
}

impl WeightModel {
    /// Cost per unit of projected area for a face at `angle`.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_topology::WeightModel;
    ///
    /// let model = WeightModel::default();
    /// let phi_min = std::f64::consts::FRAC_PI_4;
    /// assert_eq!(model.cost_per_area(0.0, false, false, phi_min), 100.0);
    /// assert_eq!(model.cost_per_area(0.0, true, false, phi_min), -80.0);
    /// assert_eq!(model.cost_per_area(0.0, true, true, phi_min), 100.0);
    /// ```
    #[must_use]
    pub fn cost_per_area(
        &self,
        angle: f64,
        grounded: bool,
        ignore_grounded: bool,
        phi_min: f64,
    ) -> f64 {
        if angle < self.flat_angle {
            if self.rests_on_bed(angle, grounded, ignore_grounded) {
                self.grounded_flat_cost
            } else {
                self.flat_cost
            }
        } else if angle < phi_min {
            self.overhang_intercept - angle * self.overhang_slope
        } else if angle < FRAC_PI_2 - self.flat_angle {
            self.shallow_intercept - angle * self.shallow_slope
        } else {
            0.0
        }
    }

    /// True if a face at `angle` is flat and its bed contact counts.
    #[must_use]
    pub fn rests_on_bed(&self, angle: f64, grounded: bool, ignore_grounded: bool) -> bool {
        angle < self.flat_angle && grounded && !ignore_grounded
    }

    /// Weight of a face: cost per area times projected area.
    #[must_use]
    pub fn weight(
        &self,
        classification: &Classification,
        corners: &[Point3<f64>; 3],
        params: &ClassifyParams,
    ) -> f64 {
        self.cost_per_area(
            classification.angle,
            classification.grounded,
            params.ignore_grounded,
            params.phi_min,
        ) * projected_area(corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_corners(z: f64) -> [Point3<f64>; 3] {
        [
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(0.0, 1.0, z),
        ]
    }

    /// Unit normal tilted `angle` away from straight down.
    fn tilted(angle: f64) -> Vector3<f64> {
        Vector3::new(angle.sin(), 0.0, -angle.cos())
    }

    #[test]
    fn downward_face_is_problematic_unless_grounded() {
        let params = ClassifyParams::default();
        let down = Vector3::new(0.0, 0.0, -1.0);

        let floating = classify(&down, &flat_corners(3.0), 0.0, &params);
        assert_relative_eq!(floating.angle, 0.0);
        assert!(!floating.grounded);
        assert!(floating.problematic);

        let resting = classify(&down, &flat_corners(0.005), 0.0, &params);
        assert!(resting.grounded);
        assert!(!resting.problematic);

        let ignored = classify(
            &down,
            &flat_corners(0.0),
            0.0,
            &params.with_ignore_grounded(true),
        );
        assert!(ignored.grounded);
        assert!(ignored.problematic);
    }

    #[test]
    fn steep_and_upward_faces_are_acceptable() {
        let params = ClassifyParams::default();
        let corners = flat_corners(5.0);

        assert!(!classify(&tilted(1.0), &corners, 0.0, &params).problematic);
        assert!(!classify(&Vector3::new(0.0, 0.0, 1.0), &corners, 0.0, &params).problematic);
        assert!(!classify(&Vector3::new(1.0, 0.0, 0.0), &corners, 0.0, &params).problematic);
    }

    #[test]
    fn tolerance_band_around_phi_min() {
        let params = ClassifyParams::default();
        let corners = flat_corners(5.0);

        let inside = classify(&tilted(params.phi_min - 0.01), &corners, 0.0, &params);
        assert!(!inside.problematic);

        let outside = classify(&tilted(params.phi_min - 0.05), &corners, 0.0, &params);
        assert!(outside.problematic);
    }

    #[test]
    fn degenerate_normal_reads_vertical() {
        assert_relative_eq!(overhang_angle(&Vector3::zeros()), FRAC_PI_2);
    }

    #[test]
    fn weight_is_monotone_in_angle() {
        let model = WeightModel::default();
        let phi = FRAC_PI_4;
        let flat = model.cost_per_area(0.05, false, false, phi);
        let shallow = model.cost_per_area(0.3, false, false, phi);
        let steep = model.cost_per_area(0.78, false, false, phi);

        assert!(flat > shallow);
        assert!(shallow > steep);
        assert_relative_eq!(shallow, 63.74 - 0.3 * 42.96);
    }

    #[test]
    fn weight_branches() {
        let model = WeightModel::default();
        let phi = FRAC_PI_4;

        assert_relative_eq!(model.cost_per_area(1.0, false, false, phi), 21.23 - 14.3);
        assert_relative_eq!(model.cost_per_area(1.5, false, false, phi), 0.0);
        assert_relative_eq!(model.cost_per_area(3.0, false, false, phi), 0.0);
    }

    #[test]
    fn projected_area_ignores_height() {
        let sloped = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 7.0),
            Point3::new(0.0, 2.0, -3.0),
        ];
        assert_relative_eq!(projected_area(&sloped), 2.0);

        let vertical = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        assert_relative_eq!(projected_area(&vertical), 0.0);
    }

    #[test]
    fn face_weight_scales_with_area() {
        let model = WeightModel::default();
        let params = ClassifyParams::default();
        let corners = flat_corners(2.0);
        let class = classify(&Vector3::new(0.0, 0.0, -1.0), &corners, 0.0, &params);

        assert_relative_eq!(model.weight(&class, &corners, &params), 50.0);
    }
}
