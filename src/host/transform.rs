//! Rigid transforms applied to imported occurrences.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

/// A coordinate system expressed as an origin and three basis vectors.
///
/// This is the form the host uses to build its 4x4 matrices: the basis
/// vectors become the first three columns and the origin the fourth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Origin of the coordinate system.
    pub origin: [f64; 3],
    /// X basis vector.
    pub x_axis: [f64; 3],
    /// Y basis vector.
    pub y_axis: [f64; 3],
    /// Z basis vector.
    pub z_axis: [f64; 3],
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        origin: [0.0, 0.0, 0.0],
        x_axis: [1.0, 0.0, 0.0],
        y_axis: [0.0, 1.0, 0.0],
        z_axis: [0.0, 0.0, 1.0],
    };

    /// Rotation by `angle` radians about the X axis, through the origin.
    ///
    /// The X axis is kept; Y is rotated by `angle` and Z by the
    /// quarter-turn-shifted angle.
    #[must_use]
    pub fn rotation_about_x(angle: f64) -> Self {
        let shifted = angle + FRAC_PI_2;
        Self {
            origin: [0.0, 0.0, 0.0],
            x_axis: [1.0, 0.0, 0.0],
            y_axis: [0.0, angle.cos(), angle.sin()],
            z_axis: [0.0, shifted.cos(), shifted.sin()],
        }
    }

    /// Whether the basis vectors are unit length and mutually perpendicular.
    #[must_use]
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        let axes = [self.x_axis, self.y_axis, self.z_axis];
        for (i, a) in axes.iter().enumerate() {
            if (dot(*a, *a) - 1.0).abs() > tolerance {
                return false;
            }
            for b in &axes[i + 1..] {
                if dot(*a, *b).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0].mul_add(b[0], a[1].mul_add(b[1], a[2] * b[2]))
}
